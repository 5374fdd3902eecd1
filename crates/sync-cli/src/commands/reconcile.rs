//! One-shot connect and initial merge

use std::path::Path;

use colored::Colorize;
use sync_core::{PassReport, SyncConfig, SyncState, SyncStatus};

use crate::context::SessionContext;
use crate::error::Result;

/// Connect to `dir`, merge it with the (optionally seeded) virtual tree and
/// disconnect again.
pub async fn run_reconcile(
    dir: &Path,
    seed: Option<&Path>,
    json: bool,
    config: SyncConfig,
) -> Result<()> {
    let SessionContext {
        runtime,
        mut controller,
        picker,
    } = SessionContext::new(dir, seed, config)?;

    let report = controller.connect(&picker).await?;
    let status = controller.status();
    let vfs_files = runtime.files().len();
    controller.disconnect().await?;

    if json {
        let output = serde_json::json!({
            "status": status,
            "report": report,
            "vfs_files": vfs_files,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    print_status(&status);
    print_report(&report);
    println!("  {:<16} {}", "Virtual files:".dimmed(), vfs_files);
    Ok(())
}

pub fn print_status(status: &SyncStatus) {
    let label = match &status.state {
        SyncState::Disconnected => "disconnected".dimmed(),
        SyncState::SyncingInitial { progress } => {
            format!("syncing {:>3.0}%", progress * 100.0).yellow()
        }
        SyncState::Connected => "connected".green().bold(),
        SyncState::Error { .. } => "error".red().bold(),
    };
    print!("{} {}", "Sync:".bold(), label);
    if let Some(root) = &status.root {
        print!(" {}", root.display().to_string().cyan());
    }
    println!();
    if let SyncState::Error { message } = &status.state {
        println!("  {}", message.red());
    }
}

fn print_report(report: &PassReport) {
    println!(
        "  {:<16} {}",
        "Written to VFS:".dimmed(),
        report.written_vfs.len()
    );
    println!(
        "  {:<16} {}",
        "Written locally:".dimmed(),
        report.written_local.len()
    );
    for path in &report.written_local {
        println!("    {} {}", "+".green(), path);
    }
    for (path, reason) in &report.failures {
        println!("    {} {} ({})", "!".yellow(), path, reason);
    }
}
