//! Build automation tasks for ProtDom
//!
//! - Generating the CLI reference from the clap definitions

use clap::Parser;
use std::fs;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "Build automation tasks for ProtDom", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Parser)]
enum Command {
    /// Generate the CLI reference in markdown
    GenerateCliDocs {
        /// Output directory for generated documentation
        #[arg(short, long, default_value = "docs")]
        output_dir: String,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::GenerateCliDocs { output_dir } => generate_cli_docs(&output_dir)?,
    }

    Ok(())
}

fn generate_cli_docs(output_dir: &str) -> anyhow::Result<()> {
    println!("Generating CLI documentation...");

    let markdown = clap_markdown::help_markdown::<protdom_cli::Cli>();

    let content = format!(
        r#"# ProtDom CLI Reference

This documentation is auto-generated from the CLI source code. Last updated: {}.

## Overview

`protdom` looks up InterPro family/domain annotations for a list of UniProt
accessions, resolves overlapping matches into non-overlapping domain layouts,
and optionally retrieves domain sequences, AlphaFold structures and
per-domain trimmed structures.

## Quick Start

```bash
# Domain layouts only
protdom run --input accessions.txt --entries IPR000719 --output results

# Everything, tolerating failed InterPro lookups
protdom run --input accessions.txt --entries IPR000719,IPR011009 \
  --output results --fasta --structures --trim --tolerate-partial

# Trim an existing structure directory
protdom trim --structures my_pdbs --ranges results/domain_ranges.txt \
  --output trimmed --accept-custom
```

## Commands

{}

## Environment Variables

- `PROTDOM_OUTPUT_DIR` - Default output directory
- `PROTDOM_MAX_RETRIES`, `PROTDOM_BACKOFF_UNIT_MS`, `PROTDOM_REQUEST_TIMEOUT_SECS` - HTTP retry behaviour
- `PROTDOM_INTERPRO_API_URL`, `PROTDOM_UNIPROT_API_URL`, `PROTDOM_ALPHAFOLD_API_URL` - Service endpoints
- `PROTDOM_DOWNLOAD_CONCURRENCY` - Parallel structure downloads (1-64)
- `PROTDOM_LOG_LEVEL`, `PROTDOM_LOG_OUTPUT`, `PROTDOM_LOG_FORMAT`, `PROTDOM_LOG_DIR` - Logging

---

*To update, run `cargo xtask generate-cli-docs`.*
"#,
        chrono::Utc::now().format("%Y-%m-%d"),
        markdown
    );

    let output_path = PathBuf::from(output_dir);
    fs::create_dir_all(&output_path)?;

    let file_path = output_path.join("cli-reference.md");
    fs::write(&file_path, content)?;

    println!("Generated CLI documentation at: {}", file_path.display());

    Ok(())
}
