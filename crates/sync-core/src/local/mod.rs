//! The user-granted local directory side of synchronization.

mod directory;
mod picker;

pub use directory::LocalDirectory;
pub use picker::{DirectoryPicker, NativeDirectoryPicker};

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sync_fs::{PathPolicy, RelativePath};

use crate::Result;

/// Modification time of a local entry.
pub type Timestamp = DateTime<Utc>;

/// A file found while enumerating the local directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalEntry {
    pub path: RelativePath,
    pub modified: Timestamp,
}

/// Access to the granted local directory.
///
/// Every operation may fail with [`crate::Error::PermissionRevoked`] once
/// the grant has been withdrawn; that failure is fatal to the session.
#[async_trait]
pub trait LocalStore: Send + Sync {
    /// The granted directory, for display and logging.
    fn root(&self) -> &Path;

    /// Every file below the root, minus policy-excluded subtrees.
    ///
    /// A root that no longer exists yields an empty list.
    async fn enumerate(&self, policy: &PathPolicy) -> Result<Vec<LocalEntry>>;

    /// Fails with `NotFound` if the file was deleted since enumeration.
    async fn read(&self, path: &RelativePath) -> Result<Vec<u8>>;

    /// Create missing parents and atomically replace the file's content.
    async fn write(&self, path: &RelativePath, bytes: &[u8]) -> Result<()>;

    /// Current modification time of a file.
    async fn modified(&self, path: &RelativePath) -> Result<Timestamp>;

    /// Recursively remove an entry. Removing an absent entry succeeds.
    async fn remove(&self, path: &RelativePath) -> Result<()>;
}
