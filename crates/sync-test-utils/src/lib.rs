//! Shared test fixtures for the ide-sync workspace.
//!
//! Dev-dependency only, never published.
//!
//! # Modules
//!
//! - [`project`]: [`TestProject`] temporary directory builder
//! - [`faults`]: store and runtime wrappers that inject failures and count
//!   writes
//! - [`picker`]: directory pickers for driving `SyncController::connect`

pub mod faults;
pub mod picker;
pub mod project;

pub use faults::{FaultyLocalStore, FaultyRuntime};
pub use picker::{StorePicker, UnsupportedPicker};
pub use project::TestProject;

use sync_core::RelativePath;

/// Parse a relative path, panicking on invalid input.
pub fn rel(path: &str) -> RelativePath {
    RelativePath::parse(path).unwrap_or_else(|e| panic!("invalid test path {path:?}: {e}"))
}
