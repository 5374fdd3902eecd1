//! SyncEngine implementation
//!
//! The engine runs individual reconciliation passes over a [`SyncSnapshot`].
//! It holds no lock of its own; callers hand it exclusive access to the
//! snapshot for the duration of a pass.

use std::collections::HashSet;
use std::sync::Arc;

use sync_fs::{PathPolicy, RelativePath, fingerprint};

use super::report::PassReport;
use super::snapshot::SyncSnapshot;
use crate::local::LocalStore;
use crate::vfs::VfsStore;
use crate::{Error, Result};

/// Reconciles a local directory with the VFS.
pub struct SyncEngine {
    local: Arc<dyn LocalStore>,
    vfs: VfsStore,
    policy: PathPolicy,
}

impl SyncEngine {
    pub fn new(local: Arc<dyn LocalStore>, vfs: VfsStore, policy: PathPolicy) -> Self {
        Self { local, vfs, policy }
    }

    pub fn local(&self) -> &Arc<dyn LocalStore> {
        &self.local
    }

    pub fn vfs(&self) -> &VfsStore {
        &self.vfs
    }

    pub fn policy(&self) -> &PathPolicy {
        &self.policy
    }

    /// Merge both stores into `snapshot`, local content winning on overlap.
    ///
    /// Every local file is copied into the VFS, then every VFS-only file is
    /// copied to disk. `progress` receives the completed fraction after each
    /// path. Any failure other than a vanished path aborts the pass, since a
    /// half-applied merge leaves no record of which paths made it.
    pub async fn initial_reconcile<F>(
        &self,
        snapshot: &mut SyncSnapshot,
        mut progress: F,
    ) -> Result<PassReport>
    where
        F: FnMut(f32) + Send,
    {
        let mut report = PassReport::default();

        let local_entries = self.local.enumerate(&self.policy).await?;
        let listing = self.vfs.enumerate(&self.policy).await;

        let local_paths: HashSet<&RelativePath> = local_entries.iter().map(|e| &e.path).collect();
        let vfs_only: Vec<&RelativePath> = listing
            .files
            .iter()
            .filter(|path| !local_paths.contains(path))
            .collect();

        let total = local_entries.len() + vfs_only.len();
        let mut processed = 0usize;
        let mut advance = |processed: usize| {
            if total > 0 {
                progress(processed as f32 / total as f32);
            }
        };
        tracing::info!(
            local = local_entries.len(),
            vfs_only = vfs_only.len(),
            "Starting initial reconciliation"
        );

        for entry in &local_entries {
            match self.local.read(&entry.path).await {
                Ok(bytes) => {
                    self.vfs.write(&entry.path, &bytes).await?;
                    snapshot.record(entry.path.clone(), fingerprint(&bytes), entry.modified);
                    report.written_vfs.push(entry.path.clone());
                }
                Err(Error::NotFound { .. }) => {
                    tracing::debug!(path = %entry.path, "Local file vanished before import");
                }
                Err(e) => return Err(e),
            }
            processed += 1;
            advance(processed);
        }

        for path in vfs_only {
            match self.vfs.read(path).await {
                Ok(bytes) => {
                    self.local.write(path, &bytes).await?;
                    let modified = self.local.modified(path).await?;
                    snapshot.record(path.clone(), fingerprint(&bytes), modified);
                    report.written_local.push(path.clone());
                }
                Err(Error::NotFound { .. }) => {
                    tracing::debug!(path = %path, "VFS file vanished before export");
                }
                Err(e) => return Err(e),
            }
            processed += 1;
            advance(processed);
        }

        progress(1.0);
        report.log_summary("initial");
        Ok(report)
    }

    /// Push VFS changes and deletions to the local directory.
    pub async fn sync_vfs_to_local(&self, snapshot: &mut SyncSnapshot) -> Result<PassReport> {
        let mut report = PassReport::default();
        let listing = self.vfs.enumerate(&self.policy).await;

        for path in &listing.files {
            let bytes = match self.vfs.read(path).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    skip_path(&mut report, path, e)?;
                    continue;
                }
            };

            let fp = fingerprint(&bytes);
            if snapshot.fingerprint(path) == Some(fp) {
                report.unchanged += 1;
                continue;
            }

            if let Err(e) = self.local.write(path, &bytes).await {
                skip_path(&mut report, path, e)?;
                continue;
            }
            // Observe our own write now so the poller does not mistake it
            // for an external edit.
            let modified = match self.local.modified(path).await {
                Ok(ts) => ts,
                Err(e) => {
                    skip_path(&mut report, path, e)?;
                    continue;
                }
            };
            tracing::debug!(path = %path, fingerprint = %fp, "VFS -> local");
            snapshot.record(path.clone(), fp, modified);
            report.written_local.push(path.clone());
        }

        let present: HashSet<&RelativePath> = listing.files.iter().collect();
        for path in snapshot.vfs_paths() {
            if present.contains(&path) {
                continue;
            }
            if listing.is_obscured(&path) {
                tracing::debug!(path = %path, "Keeping file under unreadable VFS directory");
                continue;
            }

            if let Err(e) = self.local.remove(&path).await {
                skip_path(&mut report, &path, e)?;
                continue;
            }
            tracing::debug!(path = %path, "Removed locally after VFS deletion");
            snapshot.forget(&path);
            report.removed_local.push(path);
        }

        report.log_summary("vfs-to-local");
        Ok(report)
    }

    /// Push local edits into the VFS.
    ///
    /// Local deletions are deliberately not propagated.
    pub async fn sync_local_to_vfs(&self, snapshot: &mut SyncSnapshot) -> Result<PassReport> {
        let mut report = PassReport::default();
        let entries = self.local.enumerate(&self.policy).await?;

        for entry in entries {
            let path = &entry.path;
            if snapshot.timestamp(path) == Some(entry.modified) {
                report.unchanged += 1;
                continue;
            }

            let bytes = match self.local.read(path).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    skip_path(&mut report, path, e)?;
                    continue;
                }
            };

            let fp = fingerprint(&bytes);
            if snapshot.fingerprint(path) == Some(fp) {
                tracing::trace!(path = %path, "Echo of an earlier write");
                snapshot.record_timestamp(path.clone(), entry.modified);
                report.unchanged += 1;
                continue;
            }

            if let Err(e) = self.vfs.write(path, &bytes).await {
                skip_path(&mut report, path, e)?;
                continue;
            }
            tracing::debug!(path = %path, fingerprint = %fp, "local -> VFS");
            snapshot.record(path.clone(), fp, entry.modified);
            report.written_vfs.push(path.clone());
        }

        report.log_summary("local-to-vfs");
        Ok(report)
    }
}

/// Record a per-path failure and carry on, unless it ends the session.
fn skip_path(report: &mut PassReport, path: &RelativePath, err: Error) -> Result<()> {
    match err {
        e if e.is_fatal() => Err(e),
        Error::NotFound { .. } => {
            tracing::debug!(path = %path, "Path vanished during pass");
            Ok(())
        }
        e => {
            tracing::warn!(path = %path, "Skipping path: {}", e);
            report.failures.push((path.clone(), e.to_string()));
            Ok(())
        }
    }
}

impl std::fmt::Debug for SyncEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEngine")
            .field("local", &self.local.root())
            .field("vfs", &self.vfs)
            .field("policy", &self.policy)
            .finish()
    }
}
