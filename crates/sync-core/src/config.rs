//! Sync configuration
//!
//! Loaded from TOML, JSON or YAML (by extension) through
//! [`sync_fs::ConfigStore`]. Every field has a default, so an empty file is
//! a valid configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sync_fs::{ConfigStore, ExcludedDir, PathPolicy, RobustnessConfig};

use crate::{Error, Result};

/// Name of the directory holding user configuration.
pub const CONFIG_DIR_NAME: &str = "ide-sync";

/// Default configuration file name inside [`CONFIG_DIR_NAME`].
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Tunables for a sync session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Quiet period after the last VFS change before propagating to disk
    pub debounce_ms: u64,
    /// How often the local directory is scanned for edits
    pub poll_interval_ms: u64,
    /// Virtual directory mirrored into the granted local directory
    pub vfs_root: String,
    /// Top-level directory names never synchronized in either direction
    pub excluded_dirs: Vec<String>,
    pub robustness: RobustnessSettings,
}

/// Atomic-write tuning for local file writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RobustnessSettings {
    pub lock_timeout_ms: u64,
    pub fsync: bool,
}

impl Default for RobustnessSettings {
    fn default() -> Self {
        let defaults = RobustnessConfig::default();
        Self {
            lock_timeout_ms: defaults.lock_timeout.as_millis() as u64,
            fsync: defaults.enable_fsync,
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 300,
            poll_interval_ms: 2000,
            vfs_root: "/".to_string(),
            excluded_dirs: ExcludedDir::ALL
                .iter()
                .map(|dir| dir.as_str().to_string())
                .collect(),
            robustness: RobustnessSettings::default(),
        }
    }
}

impl SyncConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn policy(&self) -> PathPolicy {
        PathPolicy::new(self.excluded_dirs.iter())
    }

    pub fn robustness(&self) -> RobustnessConfig {
        RobustnessConfig {
            lock_timeout: Duration::from_millis(self.robustness.lock_timeout_ms),
            enable_fsync: self.robustness.fsync,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_ms == 0 {
            return Err(Error::InvalidConfig {
                message: "poll_interval_ms must be greater than zero".to_string(),
            });
        }
        if !self.vfs_root.starts_with('/') {
            return Err(Error::InvalidConfig {
                message: format!("vfs_root must be absolute, got {:?}", self.vfs_root),
            });
        }
        Ok(())
    }

    /// Load and validate a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let config: Self = ConfigStore::new().load(path)?;
        config.validate()?;
        tracing::debug!(path = %path.display(), "Loaded sync configuration");
        Ok(config)
    }

    /// Like [`SyncConfig::load`], but a missing file yields the defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        match Self::load(path) {
            Err(Error::Fs(e)) if e.io_kind() == Some(std::io::ErrorKind::NotFound) => {
                tracing::debug!(path = %path.display(), "No configuration file, using defaults");
                Ok(Self::default())
            }
            loaded => loaded,
        }
    }

    /// Validate and atomically write the configuration.
    pub fn save(&self, path: &Path) -> Result<()> {
        self.validate()?;
        ConfigStore::with_robustness(self.robustness()).save(path, self)?;
        Ok(())
    }

    /// Platform configuration location, e.g. `~/.config/ide-sync/config.toml`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sync_fs::RelativePath;

    #[test]
    fn defaults_match_documented_values() {
        let config = SyncConfig::default();
        assert_eq!(config.debounce(), Duration::from_millis(300));
        assert_eq!(config.poll_interval(), Duration::from_secs(2));
        assert_eq!(config.vfs_root, "/");
        assert_eq!(
            config.excluded_dirs,
            vec!["vendor", "node_modules", ".composer", ".git"]
        );
        assert_eq!(config.robustness(), RobustnessConfig::default());
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: SyncConfig = toml::from_str("debounce_ms = 50\n").unwrap();
        assert_eq!(config.debounce_ms, 50);
        assert_eq!(config.poll_interval_ms, 2000);
        assert!(config.robustness.fsync);
    }

    #[test]
    fn zero_poll_interval_is_rejected() {
        let config = SyncConfig {
            poll_interval_ms: 0,
            ..SyncConfig::default()
        };
        assert!(matches!(config.validate(), Err(Error::InvalidConfig { .. })));
    }

    #[test]
    fn relative_vfs_root_is_rejected() {
        let config = SyncConfig {
            vfs_root: "project".to_string(),
            ..SyncConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn policy_uses_configured_exclusions() {
        let config = SyncConfig {
            excluded_dirs: vec!["build".to_string()],
            ..SyncConfig::default()
        };
        let policy = config.policy();
        assert!(policy.should_skip(&RelativePath::parse("build/out.js").unwrap()));
        assert!(!policy.should_skip(&RelativePath::parse("vendor/a.php").unwrap()));
    }

    #[test]
    fn save_then_load_json() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("nested/config.json");
        let config = SyncConfig {
            debounce_ms: 10,
            vfs_root: "/app".to_string(),
            ..SyncConfig::default()
        };

        config.save(&path).unwrap();
        assert_eq!(SyncConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn missing_file_loads_defaults() {
        let temp = tempfile::tempdir().unwrap();
        let config = SyncConfig::load_or_default(&temp.path().join("absent.toml")).unwrap();
        assert_eq!(config, SyncConfig::default());
    }
}
