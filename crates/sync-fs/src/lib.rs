//! Filesystem primitives for the ide-sync engine
//!
//! Provides the relative-path join key shared by both stores, the content
//! fingerprint used for change detection, the exclusion policy, and safe
//! atomic I/O.

pub mod checksum;
pub mod config;
pub mod constants;
pub mod error;
pub mod io;
pub mod path;
pub mod policy;

pub use checksum::{Fingerprint, fingerprint};
pub use config::ConfigStore;
pub use constants::ExcludedDir;
pub use error::{Error, Result};
pub use io::RobustnessConfig;
pub use path::RelativePath;
pub use policy::PathPolicy;
