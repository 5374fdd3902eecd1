//! Session context shared by the commands
//!
//! Resolves the effective configuration and wires a controller to an
//! in-memory virtual tree, optionally seeded from a directory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use sync_core::{MemoryRuntime, NativeDirectoryPicker, SyncConfig, SyncController};

use crate::error::{CliError, Result};

/// Where the effective configuration came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Passed with `--config`
    Explicit(PathBuf),
    /// Found at the platform default location
    UserDefault(PathBuf),
    /// No file; built-in defaults
    BuiltIn,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Explicit(path) | Self::UserDefault(path) => write!(f, "{}", path.display()),
            Self::BuiltIn => f.write_str("built-in defaults"),
        }
    }
}

/// Load the configuration named on the command line, or the user default.
///
/// An explicit path must exist; a missing default file means built-in
/// defaults.
pub fn load_config(explicit: Option<&Path>) -> Result<(SyncConfig, ConfigSource)> {
    if let Some(path) = explicit {
        if !path.exists() {
            return Err(CliError::user(format!(
                "Configuration file not found: {}",
                path.display()
            )));
        }
        let config = SyncConfig::load(path)?;
        return Ok((config, ConfigSource::Explicit(path.to_path_buf())));
    }

    match SyncConfig::default_path() {
        Some(path) if path.exists() => {
            let config = SyncConfig::load(&path)?;
            Ok((config, ConfigSource::UserDefault(path)))
        }
        _ => Ok((SyncConfig::default(), ConfigSource::BuiltIn)),
    }
}

/// A controller over a fresh in-memory tree, plus a picker for `dir`.
pub struct SessionContext {
    pub runtime: Arc<MemoryRuntime>,
    pub controller: SyncController,
    pub picker: NativeDirectoryPicker,
}

impl SessionContext {
    pub fn new(dir: &Path, seed: Option<&Path>, config: SyncConfig) -> Result<Self> {
        let runtime = Arc::new(MemoryRuntime::new());
        if let Some(seed) = seed {
            let count = runtime.seed_from_dir(seed, &config.vfs_root).map_err(|e| {
                CliError::user(format!("Cannot seed from {}: {}", seed.display(), e))
            })?;
            tracing::debug!(seed = %seed.display(), count, "Seeded virtual tree");
        }

        let picker = NativeDirectoryPicker::new(dir).with_robustness(config.robustness());
        let controller = SyncController::new(runtime.clone(), config);
        Ok(Self {
            runtime,
            controller,
            picker,
        })
    }
}
