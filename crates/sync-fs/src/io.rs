//! Atomic I/O operations with file locking

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use backoff::ExponentialBackoffBuilder;
use fs2::FileExt;

use crate::{Error, Result};

/// Suffix carried by staging files while an atomic write is in progress.
pub const STAGING_SUFFIX: &str = ".idesync-tmp";

static STAGING_SEQ: AtomicU64 = AtomicU64::new(0);

/// Tuning for [`write_atomic`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RobustnessConfig {
    /// How long to keep retrying the advisory lock before giving up.
    pub lock_timeout: Duration,
    /// Whether to `fsync` the staging file before renaming it into place.
    pub enable_fsync: bool,
}

impl Default for RobustnessConfig {
    fn default() -> Self {
        Self {
            lock_timeout: Duration::from_secs(5),
            enable_fsync: true,
        }
    }
}

/// True for names produced by [`write_atomic`] while it stages content.
pub fn is_staging_file(name: &str) -> bool {
    name.starts_with('.') && name.ends_with(STAGING_SUFFIX)
}

/// Write content atomically to a file with locking.
///
/// Creates missing parent directories, stages the content in a sibling file,
/// then renames it over the target so readers never observe a partial write.
pub fn write_atomic(path: &Path, content: &[u8], config: RobustnessConfig) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }

    // Same directory keeps the rename on one filesystem
    let staging_name = format!(
        ".{}.{}.{}{}",
        path.file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default(),
        std::process::id(),
        STAGING_SEQ.fetch_add(1, Ordering::Relaxed),
        STAGING_SUFFIX,
    );
    let staging_path = path.with_file_name(&staging_name);

    let result = stage_and_rename(path, &staging_path, content, config);
    if let Err(write_err) = &result {
        match fs::remove_file(&staging_path) {
            Ok(()) => {
                tracing::debug!(
                    path = %staging_path.display(),
                    "Removed staging file after failed write: {}",
                    write_err
                );
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(
                    path = %staging_path.display(),
                    "Failed to remove staging file: {}",
                    e
                );
            }
        }
    }
    result
}

fn stage_and_rename(
    path: &Path,
    staging_path: &Path,
    content: &[u8],
    config: RobustnessConfig,
) -> Result<()> {
    let mut staging = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(staging_path)
        .map_err(|e| Error::io(staging_path, e))?;

    let policy = ExponentialBackoffBuilder::new()
        .with_initial_interval(Duration::from_millis(10))
        .with_max_interval(Duration::from_millis(250))
        .with_max_elapsed_time(Some(config.lock_timeout))
        .build();
    backoff::retry(policy, || {
        staging
            .try_lock_exclusive()
            .map_err(backoff::Error::transient)
    })
    .map_err(|_| Error::LockFailed {
        path: path.to_path_buf(),
    })?;

    staging
        .write_all(content)
        .map_err(|e| Error::io(staging_path, e))?;

    if config.enable_fsync {
        staging.sync_all().map_err(|e| Error::io(staging_path, e))?;
    } else {
        staging.flush().map_err(|e| Error::io(staging_path, e))?;
    }

    staging.unlock().map_err(|_| Error::LockFailed {
        path: path.to_path_buf(),
    })?;
    drop(staging);

    fs::rename(staging_path, path).map_err(|e| Error::io(path, e))
}

/// Read text content from a file.
pub fn read_text(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| Error::io(path, e))
}

/// Remove a file or a whole directory tree.
///
/// Removing an entry that is already gone succeeds.
pub fn remove_all(path: &Path) -> Result<()> {
    let metadata = match fs::symlink_metadata(path) {
        Ok(m) => m,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(Error::io(path, e)),
    };

    let removed = if metadata.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };

    match removed {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::io(path, e)),
    }
}
