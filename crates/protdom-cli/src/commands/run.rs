//! `protdom run` command implementation

use crate::input::read_accessions;
use crate::progress::{create_progress_bar, BarSink};
use crate::RunArgs;
use anyhow::{Context, Result};
use colored::Colorize;
use protdom_retriever::{
    CancellationToken, PipelineOrchestrator, PipelineRequest, Progress, RetrieverConfig,
};
use std::sync::Arc;
use tracing::info;

/// Build the retriever config for `args` on top of the environment
pub fn build_config(args: &RunArgs) -> RetrieverConfig {
    let mut config = RetrieverConfig::from_env()
        .with_output_dir(&args.output)
        .with_tolerate_partial(args.tolerate_partial);
    if args.accept_custom {
        config = config.with_custom_structures(args.custom_strict, args.structure_dir.clone());
    }
    config
}

pub fn build_request(args: &RunArgs, accessions: Vec<String>) -> PipelineRequest {
    let mut request = PipelineRequest::new(accessions, args.entries.clone());
    if args.fasta {
        request = request.with_sequences();
    }
    if args.structures {
        request = request.with_structures();
    }
    if args.trim {
        request = request.with_trimming();
    }
    request
}

/// Run the pipeline; the summary (partial on failure) is always printed
pub async fn run(args: &RunArgs, cancel: CancellationToken) -> Result<()> {
    let accessions = read_accessions(&args.input)?;
    println!(
        "{} Loaded {} accessions from {}",
        "→".cyan(),
        accessions.len(),
        args.input.display()
    );

    let config = build_config(args);
    let request = build_request(args, accessions);

    let pb = create_progress_bar("Starting analysis");
    let progress = Progress::new(Arc::new(BarSink::new(pb.clone())));

    let mut orchestrator = PipelineOrchestrator::new(config, progress)
        .context("Invalid configuration")?
        .with_cancellation(cancel);

    let outcome = orchestrator.run(request).await;
    pb.finish_and_clear();

    match outcome {
        Ok(result) => {
            println!("{}", result.summary);
            println!(
                "\n{} Results saved to {}",
                "✓".green().bold(),
                orchestrator.config().output_dir.display()
            );
            info!(run_id = %result.run_id, "Run finished");
            Ok(())
        },
        Err(failure) => {
            println!("{}", failure.partial.summary);
            if failure.is_stopped() {
                println!("\n{} Processing stopped by user", "!".yellow().bold());
            }
            Err(failure.into())
        },
    }
}
