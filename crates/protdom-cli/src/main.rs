//! ProtDom CLI - Main entry point

use clap::Parser;
use protdom_cli::{Cli, Commands};
use protdom_common::logging::{init_logging, LogConfig, LogLevel, LogOutput};
use protdom_retriever::CancellationToken;
use std::process;
use tracing::{error, warn};

#[tokio::main]
async fn main() {
    // Settings from a local .env file, if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    if cli.markdown_help {
        println!("{}", clap_markdown::help_markdown::<Cli>());
        return;
    }

    let Some(command) = cli.command else {
        eprintln!("Error: A subcommand is required");
        eprintln!();
        eprintln!("For more information, try '--help'.");
        process::exit(2);
    };

    let level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Warn
    };
    let log_config = LogConfig::builder()
        .level(level)
        .output(LogOutput::Console)
        .log_file_prefix("protdom")
        .build();

    // Environment variables take precedence over the flag-derived defaults
    let log_config = match log_config.clone().merge_env() {
        Ok(merged) => merged,
        Err(e) => {
            eprintln!("Warning: ignoring logging environment: {}", e);
            log_config
        },
    };

    // The CLI still works when a subscriber is already installed
    let _ = init_logging(&log_config);

    let result = match command {
        Commands::Run(args) => {
            let cancel = CancellationToken::new();
            spawn_ctrl_c_handler(cancel.clone());
            protdom_cli::commands::run::run(&args, cancel).await
        },
        Commands::Trim(args) => protdom_cli::commands::trim::run(&args),
    };

    if let Err(e) = result {
        error!(error = %e, "Command failed");
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

/// First Ctrl-C requests a cooperative stop; the run ends at the next checkpoint
fn spawn_ctrl_c_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping after the current step");
            eprintln!("\nStopping... waiting for the current step to finish");
            cancel.cancel();
        }
    });
}
