//! Long-running session

use std::path::Path;

use colored::Colorize;
use sync_core::{SyncConfig, SyncState};

use super::reconcile::print_status;
use crate::context::SessionContext;
use crate::error::{CliError, Result};

/// Keep a session running until Ctrl-C or a session-fatal error.
pub async fn run_watch(dir: &Path, seed: Option<&Path>, config: SyncConfig) -> Result<()> {
    let SessionContext {
        mut controller,
        picker,
        ..
    } = SessionContext::new(dir, seed, config)?;

    let mut status = controller.subscribe();
    controller.connect(&picker).await?;
    print_status(&status.borrow_and_update());
    println!("{}", "Watching for changes, press Ctrl-C to stop".dimmed());

    let outcome = loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal?;
                break Ok(());
            }
            changed = status.changed() => {
                if changed.is_err() {
                    break Ok(());
                }
                let current = status.borrow_and_update().clone();
                if let SyncState::Error { message } = current.state {
                    break Err(CliError::user(message));
                }
                if let Some(at) = current.last_pass_at {
                    tracing::debug!(at = %at, "Pass completed");
                }
            }
        }
    };

    controller.disconnect().await?;
    println!("{}", "Session stopped".dimmed());
    outcome
}
