//! ide-sync CLI
//!
//! Drives a sync session between a local directory and an in-memory virtual
//! project tree, optionally seeded from another directory.

mod cli;
mod commands;
mod context;
mod error;

use clap::Parser;
use colored::Colorize;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use cli::{Cli, Commands};
use error::{CliError, Result};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("{}: {}", "error".red().bold(), e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(Level::DEBUG)
            .with_target(true)
            .with_writer(std::io::stderr)
            .finish();
        tracing::subscriber::set_global_default(subscriber)
            .map_err(|e| CliError::user(format!("Failed to set tracing subscriber: {e}")))?;
        tracing::debug!("Verbose mode enabled");
    } else if let Err(e) = sync_core::logging::init_with_default("warn") {
        eprintln!("{}: logging disabled: {}", "warning".yellow(), e);
    }

    let Some(command) = cli.command else {
        println!("{} Sync a virtual project tree with a local directory", "ide-sync".green().bold());
        println!();
        println!("Run {} for available commands.", "ide-sync --help".cyan());
        return Ok(());
    };

    let (config, source) = context::load_config(cli.config.as_deref())?;
    tracing::debug!(source = %source, "Configuration resolved");

    match command {
        Commands::Reconcile { dir, seed, json } => {
            commands::run_reconcile(&dir, seed.as_deref(), json, config).await
        }
        Commands::Watch { dir, seed } => commands::run_watch(&dir, seed.as_deref(), config).await,
        Commands::Config { json } => commands::run_config_show(&config, &source, json),
    }
}
