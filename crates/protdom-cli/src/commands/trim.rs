//! `protdom trim` command implementation
//!
//! Trims an existing structure directory without running the pipeline.

use crate::progress::{create_progress_bar, BarSink};
use crate::TrimArgs;
use anyhow::{Context, Result};
use colored::Colorize;
use protdom_retriever::trim::{load_domain_ranges, TrimStage};
use protdom_retriever::{Progress, RetrieverConfig};
use std::sync::Arc;

pub fn run(args: &TrimArgs) -> Result<()> {
    let mut config = RetrieverConfig::from_env().with_output_dir(&args.output);
    if args.accept_custom {
        config = config.with_custom_structures(args.custom_strict, None);
    }
    config.validate().context("Invalid configuration")?;

    let ranges = load_domain_ranges(&args.ranges)?;
    println!(
        "{} Loaded {} domain ranges from {}",
        "→".cyan(),
        ranges.len(),
        args.ranges.display()
    );

    std::fs::create_dir_all(&config.output_dir).with_context(|| {
        format!("Failed to create output directory {}", config.output_dir.display())
    })?;

    let pb = create_progress_bar("Trimming structures");
    let progress = Progress::new(Arc::new(BarSink::new(pb.clone())));
    let outcome = TrimStage::new(&config, progress).run(&args.structures, &ranges);
    pb.finish_and_clear();
    let results = outcome?;

    println!(
        "{} Trimmed {} domains into {}",
        "✓".green().bold(),
        results.len(),
        config.trimmed_dir().display()
    );
    if !results.missing_structures.is_empty() {
        println!(
            "{} No structure file for: {}",
            "!".yellow(),
            results.missing_structures.join(", ")
        );
    }
    for failure in &results.failed {
        println!("{} {}: {}", "✗".red(), failure.id, failure.reason);
    }

    Ok(())
}
