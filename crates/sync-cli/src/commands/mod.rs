//! Command implementations for sync-cli

pub mod config;
pub mod reconcile;
pub mod watch;

pub use config::run_config_show;
pub use reconcile::run_reconcile;
pub use watch::run_watch;
