//! Per-pass outcome reporting

use serde::Serialize;
use sync_fs::RelativePath;

/// What a single reconciliation pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PassReport {
    /// Files written to the local directory
    pub written_local: Vec<RelativePath>,
    /// Files written into the VFS
    pub written_vfs: Vec<RelativePath>,
    /// Files removed locally because they left the VFS
    pub removed_local: Vec<RelativePath>,
    /// Paths found unchanged (including suppressed echoes)
    pub unchanged: usize,
    /// Per-path failures that were logged and skipped
    pub failures: Vec<(RelativePath, String)>,
}

impl PassReport {
    /// Total number of store mutations made.
    pub fn writes(&self) -> usize {
        self.written_local.len() + self.written_vfs.len() + self.removed_local.len()
    }

    /// True when the pass neither changed anything nor hit failures.
    pub fn is_quiet(&self) -> bool {
        self.writes() == 0 && self.failures.is_empty()
    }

    pub(crate) fn log_summary(&self, pass: &str) {
        if self.is_quiet() {
            tracing::debug!(pass, unchanged = self.unchanged, "Pass found no changes");
        } else {
            tracing::info!(
                pass,
                written_local = self.written_local.len(),
                written_vfs = self.written_vfs.len(),
                removed_local = self.removed_local.len(),
                unchanged = self.unchanged,
                failures = self.failures.len(),
                "Pass complete"
            );
        }
    }
}

/// Result of asking a session to run a pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassOutcome {
    Completed(PassReport),
    /// Another pass holds the snapshot; nothing was done.
    Busy,
    /// The session is not connected; nothing was done.
    Inactive,
}

impl PassOutcome {
    pub fn report(&self) -> Option<&PassReport> {
        match self {
            Self::Completed(report) => Some(report),
            _ => None,
        }
    }
}
