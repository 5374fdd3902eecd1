//! Last-synchronized state of both stores

use std::collections::HashMap;

use sync_fs::{Fingerprint, RelativePath};

use crate::local::Timestamp;

/// What the engine last synchronized, per path and per side.
///
/// A path in `vfs_fingerprints` is believed to exist in the VFS; a path in
/// `local_timestamps` is believed to exist locally. These record the last
/// synchronized state, not what currently exists.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncSnapshot {
    vfs_fingerprints: HashMap<RelativePath, Fingerprint>,
    local_timestamps: HashMap<RelativePath, Timestamp>,
}

impl SyncSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a path as synchronized on both sides.
    pub fn record(&mut self, path: RelativePath, fingerprint: Fingerprint, modified: Timestamp) {
        self.vfs_fingerprints.insert(path.clone(), fingerprint);
        self.local_timestamps.insert(path, modified);
    }

    pub fn record_timestamp(&mut self, path: RelativePath, modified: Timestamp) {
        self.local_timestamps.insert(path, modified);
    }

    pub fn fingerprint(&self, path: &RelativePath) -> Option<Fingerprint> {
        self.vfs_fingerprints.get(path).copied()
    }

    pub fn timestamp(&self, path: &RelativePath) -> Option<Timestamp> {
        self.local_timestamps.get(path).copied()
    }

    /// Drop a path from both maps.
    pub fn forget(&mut self, path: &RelativePath) {
        self.vfs_fingerprints.remove(path);
        self.local_timestamps.remove(path);
    }

    /// Paths believed to exist in the VFS, sorted.
    pub fn vfs_paths(&self) -> Vec<RelativePath> {
        let mut paths: Vec<_> = self.vfs_fingerprints.keys().cloned().collect();
        paths.sort();
        paths
    }

    pub fn len(&self) -> usize {
        self.vfs_fingerprints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vfs_fingerprints.is_empty() && self.local_timestamps.is_empty()
    }
}
