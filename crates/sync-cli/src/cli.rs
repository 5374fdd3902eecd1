//! CLI argument parsing using clap derive

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// ide-sync - Keep a virtual project tree and a local directory in sync
#[derive(Parser, Debug)]
#[command(name = "ide-sync")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file (TOML, JSON or YAML)
    #[arg(short, long, global = true, env = "IDE_SYNC_CONFIG")]
    pub config: Option<PathBuf>,

    /// The command to run
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Connect to a directory, run the initial merge and report the result
    ///
    /// Examples:
    ///   ide-sync reconcile ./app
    ///   ide-sync reconcile ./app --seed ./snapshot --json
    Reconcile {
        /// Local directory to synchronize
        dir: PathBuf,

        /// Directory whose files pre-populate the virtual tree
        #[arg(long)]
        seed: Option<PathBuf>,

        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },

    /// Keep a session running until interrupted, printing state changes
    Watch {
        /// Local directory to synchronize
        dir: PathBuf,

        /// Directory whose files pre-populate the virtual tree
        #[arg(long)]
        seed: Option<PathBuf>,
    },

    /// Show the effective configuration
    Config {
        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_reconcile_with_seed() {
        let cli = Cli::parse_from(["ide-sync", "reconcile", "app", "--seed", "snap", "--json"]);
        assert_eq!(
            cli.command,
            Some(Commands::Reconcile {
                dir: PathBuf::from("app"),
                seed: Some(PathBuf::from("snap")),
                json: true,
            })
        );
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::parse_from(["ide-sync", "config", "--config", "c.toml", "-v"]);
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("c.toml")));
    }

    #[test]
    fn no_subcommand_is_allowed() {
        let cli = Cli::parse_from(["ide-sync"]);
        assert!(cli.command.is_none());
    }
}
