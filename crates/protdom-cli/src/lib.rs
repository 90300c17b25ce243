//! ProtDom CLI Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Command-line front end for the ProtDom retriever.
//!
//! # Overview
//!
//! - **Full pipeline**: resolve domains, then optionally fetch sequences,
//!   download predicted structures and trim them (`protdom run`)
//! - **Standalone trimming**: cut domains out of an existing structure
//!   directory using a `domain_ranges.txt` file (`protdom trim`)

pub mod commands;
pub mod input;
pub mod progress;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// ProtDom - protein domain retriever
#[derive(Parser, Debug)]
#[command(name = "protdom")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Print the command reference as markdown and exit
    #[arg(long, hide = true)]
    pub markdown_help: bool,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Resolve InterPro domains for a list of accessions and run the requested stages
    Run(RunArgs),

    /// Trim domains out of existing structure files
    Trim(TrimArgs),
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// File with one UniProt accession per line
    #[arg(short, long)]
    pub input: PathBuf,

    /// InterPro entries to look for (comma separated)
    #[arg(short, long, value_delimiter = ',', required = true)]
    pub entries: Vec<String>,

    /// Output directory
    #[arg(short, long, env = "PROTDOM_OUTPUT_DIR", default_value = "protdom_results")]
    pub output: PathBuf,

    /// Retrieve domain sequences from UniProt
    #[arg(long)]
    pub fasta: bool,

    /// Download AlphaFold structures for proteins with domains
    #[arg(long)]
    pub structures: bool,

    /// Trim structures down to each domain
    #[arg(long)]
    pub trim: bool,

    /// Also trim user-supplied structure files
    #[arg(long)]
    pub accept_custom: bool,

    /// Match custom file names on whole tokens only
    #[arg(long, requires = "accept_custom")]
    pub custom_strict: bool,

    /// Read structures for trimming from this directory instead of the download directory
    #[arg(long, requires = "accept_custom")]
    pub structure_dir: Option<PathBuf>,

    /// Skip accessions whose InterPro lookup fails instead of aborting
    #[arg(long)]
    pub tolerate_partial: bool,
}

#[derive(Args, Debug, Clone)]
pub struct TrimArgs {
    /// Directory containing structure files
    #[arg(short, long)]
    pub structures: PathBuf,

    /// Domain ranges file (`ACCESSION[start-end]` per line)
    #[arg(short, long)]
    pub ranges: PathBuf,

    /// Output directory
    #[arg(short, long)]
    pub output: PathBuf,

    /// Also trim user-supplied structure files
    #[arg(long)]
    pub accept_custom: bool,

    /// Match custom file names on whole tokens only
    #[arg(long, requires = "accept_custom")]
    pub custom_strict: bool,
}
