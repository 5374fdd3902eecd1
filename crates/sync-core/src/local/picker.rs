//! Directory grant capability

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use sync_fs::RobustnessConfig;

use super::{LocalDirectory, LocalStore};
use crate::Result;

/// Obtains a handle to a user-chosen directory.
///
/// Platforms without the capability report `is_supported() == false`; the
/// controller surfaces that as [`crate::Error::UnsupportedPlatform`] before
/// any session exists.
#[async_trait]
pub trait DirectoryPicker: Send + Sync {
    fn is_supported(&self) -> bool;

    async fn pick(&self) -> Result<Arc<dyn LocalStore>>;
}

/// Grants a fixed directory on the native filesystem.
#[derive(Debug, Clone)]
pub struct NativeDirectoryPicker {
    root: PathBuf,
    robustness: RobustnessConfig,
}

impl NativeDirectoryPicker {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            robustness: RobustnessConfig::default(),
        }
    }

    pub fn with_robustness(mut self, robustness: RobustnessConfig) -> Self {
        self.robustness = robustness;
        self
    }
}

#[async_trait]
impl DirectoryPicker for NativeDirectoryPicker {
    fn is_supported(&self) -> bool {
        true
    }

    async fn pick(&self) -> Result<Arc<dyn LocalStore>> {
        let dir = LocalDirectory::open(&self.root)?.with_robustness(self.robustness);
        Ok(Arc::new(dir))
    }
}
