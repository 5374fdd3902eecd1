//! Configuration display

use colored::Colorize;
use sync_core::SyncConfig;

use crate::context::ConfigSource;
use crate::error::Result;

/// Print the effective configuration and where it came from.
pub fn run_config_show(config: &SyncConfig, source: &ConfigSource, json: bool) -> Result<()> {
    if json {
        let output = serde_json::json!({
            "source": source.to_string(),
            "config": config,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("{}", "Sync Configuration".bold());
    println!();
    println!("  {:<16} {}", "Source:".dimmed(), source);
    println!("  {:<16} {} ms", "Debounce:".dimmed(), config.debounce_ms);
    println!("  {:<16} {} ms", "Poll interval:".dimmed(), config.poll_interval_ms);
    println!("  {:<16} {}", "VFS root:".dimmed(), config.vfs_root);
    println!(
        "  {:<16} {} ms, fsync {}",
        "Lock timeout:".dimmed(),
        config.robustness.lock_timeout_ms,
        if config.robustness.fsync { "on" } else { "off" }
    );
    println!();

    if config.excluded_dirs.is_empty() {
        println!("  {:<16} {}", "Excluded:".dimmed(), "(none)".dimmed());
    } else {
        println!("  {}:", "Excluded".dimmed());
        for dir in &config.excluded_dirs {
            println!("    {} {}", "-".red(), dir);
        }
    }

    Ok(())
}
