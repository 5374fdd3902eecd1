//! Failure-injecting wrappers around the two stores.

use std::collections::HashSet;
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use sync_core::{
    Error, LocalEntry, LocalStore, MemoryRuntime, PathPolicy, RelativePath, Result, Timestamp,
    VfsRuntime,
};
use tokio::sync::watch;

/// Wraps a [`LocalStore`], counting writes and failing on demand.
pub struct FaultyLocalStore {
    inner: Arc<dyn LocalStore>,
    revoked: AtomicBool,
    failing_reads: Mutex<HashSet<RelativePath>>,
    read_delay: Mutex<Option<Duration>>,
    enumerate_delay: Mutex<Option<Duration>>,
    on_read: Mutex<Option<Box<dyn FnOnce() + Send>>>,
    writes: Mutex<Vec<RelativePath>>,
    removals: AtomicUsize,
}

impl FaultyLocalStore {
    pub fn new(inner: Arc<dyn LocalStore>) -> Self {
        Self {
            inner,
            revoked: AtomicBool::new(false),
            failing_reads: Mutex::new(HashSet::new()),
            read_delay: Mutex::new(None),
            enumerate_delay: Mutex::new(None),
            on_read: Mutex::new(None),
            writes: Mutex::new(Vec::new()),
            removals: AtomicUsize::new(0),
        }
    }

    /// Make every subsequent operation fail with `PermissionRevoked`.
    pub fn revoke(&self) {
        self.revoked.store(true, Ordering::SeqCst);
    }

    pub fn restore(&self) {
        self.revoked.store(false, Ordering::SeqCst);
    }

    /// Make reads of `path` fail with a non-fatal `ReadFailure`.
    pub fn fail_reads_of(&self, path: RelativePath) {
        self.failing_reads.lock().unwrap().insert(path);
    }

    /// Sleep this long inside every read, to hold a pass open.
    pub fn set_read_delay(&self, delay: Option<Duration>) {
        *self.read_delay.lock().unwrap() = delay;
    }

    /// Sleep this long inside every enumeration, to slow local passes down.
    pub fn set_enumerate_delay(&self, delay: Option<Duration>) {
        *self.enumerate_delay.lock().unwrap() = delay;
    }

    /// Run `hook` once, at the start of the next read.
    pub fn on_next_read(&self, hook: impl FnOnce() + Send + 'static) {
        *self.on_read.lock().unwrap() = Some(Box::new(hook));
    }

    /// Paths written so far, in order.
    pub fn writes(&self) -> Vec<RelativePath> {
        self.writes.lock().unwrap().clone()
    }

    pub fn write_count(&self) -> usize {
        self.writes.lock().unwrap().len()
    }

    pub fn removal_count(&self) -> usize {
        self.removals.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<()> {
        if self.revoked.load(Ordering::SeqCst) {
            return Err(Error::PermissionRevoked {
                path: self.inner.root().display().to_string(),
                message: "permission denied".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl LocalStore for FaultyLocalStore {
    fn root(&self) -> &Path {
        self.inner.root()
    }

    async fn enumerate(&self, policy: &PathPolicy) -> Result<Vec<LocalEntry>> {
        self.check()?;
        let delay = *self.enumerate_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.inner.enumerate(policy).await
    }

    async fn read(&self, path: &RelativePath) -> Result<Vec<u8>> {
        self.check()?;
        let hook = self.on_read.lock().unwrap().take();
        if let Some(hook) = hook {
            hook();
        }
        let delay = *self.read_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let failing = self.failing_reads.lock().unwrap().contains(path);
        if failing {
            return Err(Error::ReadFailure {
                path: path.to_string(),
                source: io::Error::other("injected read failure"),
            });
        }
        self.inner.read(path).await
    }

    async fn write(&self, path: &RelativePath, bytes: &[u8]) -> Result<()> {
        self.check()?;
        self.inner.write(path, bytes).await?;
        self.writes.lock().unwrap().push(path.clone());
        Ok(())
    }

    async fn modified(&self, path: &RelativePath) -> Result<Timestamp> {
        self.check()?;
        self.inner.modified(path).await
    }

    async fn remove(&self, path: &RelativePath) -> Result<()> {
        self.check()?;
        self.inner.remove(path).await?;
        self.removals.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Wraps a [`MemoryRuntime`], counting writes and denying listings on demand.
pub struct FaultyRuntime {
    inner: Arc<MemoryRuntime>,
    denied_listings: Mutex<HashSet<String>>,
    writes: AtomicUsize,
}

impl FaultyRuntime {
    pub fn new(inner: Arc<MemoryRuntime>) -> Self {
        Self {
            inner,
            denied_listings: Mutex::new(HashSet::new()),
            writes: AtomicUsize::new(0),
        }
    }

    pub fn inner(&self) -> &Arc<MemoryRuntime> {
        &self.inner
    }

    /// Make `list_files(dir)` fail with `PermissionDenied`.
    pub fn deny_listing(&self, dir: &str) {
        self.denied_listings.lock().unwrap().insert(dir.to_string());
    }

    pub fn allow_listing(&self, dir: &str) {
        self.denied_listings.lock().unwrap().remove(dir);
    }

    /// Number of `write_file` calls that reached the runtime.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VfsRuntime for FaultyRuntime {
    async fn list_files(&self, path: &str) -> io::Result<Vec<String>> {
        let denied = self.denied_listings.lock().unwrap().contains(path);
        if denied {
            return Err(io::Error::from(io::ErrorKind::PermissionDenied));
        }
        self.inner.list_files(path).await
    }

    async fn is_directory(&self, path: &str) -> bool {
        self.inner.is_directory(path).await
    }

    async fn file_exists(&self, path: &str) -> bool {
        self.inner.file_exists(path).await
    }

    async fn make_directory(&self, path: &str) -> io::Result<()> {
        self.inner.make_directory(path).await
    }

    async fn read_file_as_bytes(&self, path: &str) -> io::Result<Vec<u8>> {
        self.inner.read_file_as_bytes(path).await
    }

    async fn write_file(&self, path: &str, bytes: &[u8]) -> io::Result<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.write_file(path, bytes).await
    }

    fn version(&self) -> watch::Receiver<u64> {
        self.inner.version()
    }
}
