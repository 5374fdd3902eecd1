//! Directory pickers for tests.

use std::sync::Arc;

use async_trait::async_trait;
use sync_core::{DirectoryPicker, Error, LocalStore, Result};

/// Always grants the same, already-opened store.
pub struct StorePicker {
    store: Arc<dyn LocalStore>,
}

impl StorePicker {
    pub fn new(store: Arc<dyn LocalStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl DirectoryPicker for StorePicker {
    fn is_supported(&self) -> bool {
        true
    }

    async fn pick(&self) -> Result<Arc<dyn LocalStore>> {
        Ok(self.store.clone())
    }
}

/// A platform without directory access.
pub struct UnsupportedPicker;

#[async_trait]
impl DirectoryPicker for UnsupportedPicker {
    fn is_supported(&self) -> bool {
        false
    }

    async fn pick(&self) -> Result<Arc<dyn LocalStore>> {
        Err(Error::UnsupportedPlatform)
    }
}
