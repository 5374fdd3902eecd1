//! Bidirectional synchronization between an embedded runtime's virtual
//! project tree (VFS) and a directory on the user's local disk.
//!
//! The two stores change independently and neither pushes change events to
//! the other, so the engine works from snapshots:
//!
//! - **Initial reconciliation** merges both stores once per connect, with the
//!   local copy winning on overlap.
//! - **VFS → local** runs after the runtime's version counter settles
//!   (debounced), writes changed files to disk and propagates VFS deletions.
//! - **Local → VFS** runs on a fixed poll interval and writes changed files
//!   into the VFS. Local deletions are not propagated.
//!
//! # Architecture
//!
//! ```text
//!                 SyncController  (composition root, state machine)
//!                        |
//!                   SyncSession   (single-consumer task queue)
//!                        |
//!                    SyncEngine   (passes over SyncSnapshot)
//!                   /          \
//!          LocalStore            VfsStore
//!       (LocalDirectory)     (VfsRuntime contract)
//!                   \          /
//!                     sync-fs
//! ```

pub mod config;
pub mod error;
pub mod local;
pub mod logging;
pub mod sync;
pub mod vfs;

pub use config::{RobustnessSettings, SyncConfig};
pub use error::{Error, Result};
pub use local::{
    DirectoryPicker, LocalDirectory, LocalEntry, LocalStore, NativeDirectoryPicker, Timestamp,
};
pub use sync::{
    PassOutcome, PassReport, SessionStats, SyncController, SyncEngine, SyncSession, SyncSnapshot,
    SyncState, SyncStateKind, SyncStateMachine, SyncStatus,
};
pub use vfs::{MemoryRuntime, VfsListing, VfsRuntime, VfsStore};

pub use sync_fs::{Fingerprint, PathPolicy, RelativePath, fingerprint};
