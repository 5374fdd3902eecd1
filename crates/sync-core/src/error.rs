//! Error types for sync-core
//!
//! The variants split into two groups. Per-path failures (`NotFound`,
//! `ReadFailure`, `WriteFailure`) never escape a steady-state pass; they are
//! logged and recorded in the pass report. `PermissionRevoked` is the only
//! session-fatal failure and moves the state machine to `error`.

use std::fmt::Display;
use std::io;

use crate::sync::SyncStateKind;

/// Result type for sync-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in sync-core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Path vanished between enumeration and access
    #[error("Not found: {path}")]
    NotFound { path: String },

    /// Access to the granted directory was withdrawn
    #[error("Access to {path} was revoked ({message}); reconnect to grant access again")]
    PermissionRevoked { path: String, message: String },

    /// A single file could not be written
    #[error("Failed to write {path}: {source}")]
    WriteFailure {
        path: String,
        #[source]
        source: io::Error,
    },

    /// A single file could not be read
    #[error("Failed to read {path}: {source}")]
    ReadFailure {
        path: String,
        #[source]
        source: io::Error,
    },

    /// The local directory capability is absent
    #[error("Local directory access is not supported on this platform")]
    UnsupportedPlatform,

    /// Lifecycle transition not allowed by the state machine
    #[error("Invalid sync state transition: {from} -> {to}")]
    InvalidTransition {
        from: SyncStateKind,
        to: SyncStateKind,
    },

    /// Operation requires a granted directory
    #[error("No local directory has been granted")]
    NotConnected,

    /// Configuration rejected by validation
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// Filesystem error from sync-fs
    #[error(transparent)]
    Fs(#[from] sync_fs::Error),
}

impl Error {
    /// True for failures that end the session.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::PermissionRevoked { .. })
    }

    pub(crate) fn permission_revoked(path: impl Display, source: &io::Error) -> Self {
        Self::PermissionRevoked {
            path: path.to_string(),
            message: source.to_string(),
        }
    }

    /// Classify a failed read against the virtual tree.
    pub(crate) fn vfs_read(path: impl Display, source: io::Error) -> Self {
        match source.kind() {
            io::ErrorKind::NotFound => Self::NotFound {
                path: path.to_string(),
            },
            _ => Self::ReadFailure {
                path: path.to_string(),
                source,
            },
        }
    }

    /// Classify a failed write against the virtual tree.
    pub(crate) fn vfs_write(path: impl Display, source: io::Error) -> Self {
        Self::WriteFailure {
            path: path.to_string(),
            source,
        }
    }

    /// Pull the OS error back out of a sync-fs error.
    pub(crate) fn into_io(err: sync_fs::Error) -> io::Error {
        match err {
            sync_fs::Error::Io { source, .. } => source,
            other => io::Error::other(other.to_string()),
        }
    }
}
