//! The embedded runtime's virtual project tree.
//!
//! The runtime is an external collaborator; [`VfsRuntime`] is the narrow
//! contract it exposes. [`VfsStore`] adds path filtering and recursion on
//! top of that contract.

mod memory;

pub use memory::MemoryRuntime;

use std::io;
use std::sync::Arc;

use async_trait::async_trait;
use sync_fs::{PathPolicy, RelativePath};
use tokio::sync::watch;

use crate::{Error, Result};

/// Collaborator contract exposed by the embedded runtime.
///
/// Paths are absolute, `/`-separated virtual paths. The version counter
/// increments on every write made through the runtime.
#[async_trait]
pub trait VfsRuntime: Send + Sync {
    /// Entry names (not paths) directly inside `path`.
    async fn list_files(&self, path: &str) -> io::Result<Vec<String>>;

    async fn is_directory(&self, path: &str) -> bool;

    async fn file_exists(&self, path: &str) -> bool;

    async fn make_directory(&self, path: &str) -> io::Result<()>;

    async fn read_file_as_bytes(&self, path: &str) -> io::Result<Vec<u8>>;

    async fn write_file(&self, path: &str, bytes: &[u8]) -> io::Result<()>;

    /// Observe the write-version counter.
    fn version(&self) -> watch::Receiver<u64>;
}

/// Result of walking the virtual tree.
///
/// Subtrees whose listing failed are recorded rather than reported as
/// errors; their files are simply absent from `files`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VfsListing {
    pub files: Vec<RelativePath>,
    /// Directories that could not be listed; `None` is the root itself.
    pub unreadable: Vec<Option<RelativePath>>,
}

impl VfsListing {
    /// Whether `path` lies inside a subtree that could not be listed.
    pub fn is_obscured(&self, path: &RelativePath) -> bool {
        self.unreadable.iter().any(|dir| match dir {
            None => true,
            Some(dir) => {
                let dir = dir.as_str();
                path.as_str()
                    .strip_prefix(dir)
                    .is_some_and(|rest| rest.starts_with('/'))
            }
        })
    }
}

/// Recursive, policy-filtered access to the virtual tree under a root.
#[derive(Clone)]
pub struct VfsStore {
    runtime: Arc<dyn VfsRuntime>,
    root: String,
}

impl VfsStore {
    pub fn new(runtime: Arc<dyn VfsRuntime>, root: impl Into<String>) -> Self {
        let root = root.into();
        let root = match root.trim_end_matches('/') {
            "" => "/".to_string(),
            trimmed if trimmed.starts_with('/') => trimmed.to_string(),
            trimmed => format!("/{}", trimmed),
        };
        Self { runtime, root }
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    fn virtual_path(&self, path: &RelativePath) -> String {
        path.to_virtual(&self.root)
    }

    /// Every file under the root, minus policy-excluded subtrees.
    ///
    /// Never fails: a directory that cannot be listed contributes no entries.
    pub async fn enumerate(&self, policy: &PathPolicy) -> VfsListing {
        let mut listing = VfsListing::default();
        let mut pending: Vec<Option<RelativePath>> = vec![None];

        while let Some(prefix) = pending.pop() {
            let dir = match &prefix {
                Some(rel) => self.virtual_path(rel),
                None => self.root.clone(),
            };

            let names = match self.runtime.list_files(&dir).await {
                Ok(names) => names,
                Err(e) => {
                    tracing::warn!(dir = %dir, "Cannot list VFS directory, treating as empty: {}", e);
                    listing.unreadable.push(prefix);
                    continue;
                }
            };

            for name in names {
                if name == "." || name == ".." {
                    continue;
                }
                let rel = match &prefix {
                    Some(parent) => parent.join(&name),
                    None => RelativePath::parse(&name),
                };
                let rel = match rel {
                    Ok(rel) => rel,
                    Err(e) => {
                        tracing::warn!(dir = %dir, "Skipping VFS entry {:?}: {}", name, e);
                        continue;
                    }
                };
                if policy.should_skip(&rel) {
                    continue;
                }

                if self.runtime.is_directory(&self.virtual_path(&rel)).await {
                    pending.push(Some(rel));
                } else {
                    listing.files.push(rel);
                }
            }
        }

        listing.files.sort();
        listing
    }

    pub async fn read(&self, path: &RelativePath) -> Result<Vec<u8>> {
        let target = self.virtual_path(path);
        self.runtime
            .read_file_as_bytes(&target)
            .await
            .map_err(|e| Error::vfs_read(&target, e))
    }

    /// Write a file, creating the root and any missing parent directories
    /// first.
    pub async fn write(&self, path: &RelativePath, bytes: &[u8]) -> Result<()> {
        let target = self.virtual_path(path);

        // Deepest first
        let mut ancestors = Vec::new();
        let mut cursor = path.parent();
        while let Some(dir) = cursor {
            ancestors.push(self.virtual_path(&dir));
            cursor = dir.parent();
        }
        let mut root = self.root.as_str();
        while root != "/" {
            ancestors.push(root.to_string());
            root = match root.rfind('/') {
                Some(0) | None => "/",
                Some(idx) => &root[..idx],
            };
        }

        for dir in ancestors.into_iter().rev() {
            if !self.runtime.file_exists(&dir).await {
                self.runtime
                    .make_directory(&dir)
                    .await
                    .map_err(|e| Error::vfs_write(&dir, e))?;
            }
        }

        self.runtime
            .write_file(&target, bytes)
            .await
            .map_err(|e| Error::vfs_write(&target, e))
    }

    /// Subscribe to the runtime's write-version counter.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.runtime.version()
    }
}

impl std::fmt::Debug for VfsStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VfsStore").field("root", &self.root).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rel(s: &str) -> RelativePath {
        RelativePath::parse(s).unwrap()
    }

    #[test]
    fn obscured_paths_follow_directory_boundaries() {
        let listing = VfsListing {
            files: vec![],
            unreadable: vec![Some(rel("src"))],
        };
        assert!(listing.is_obscured(&rel("src/a.php")));
        assert!(!listing.is_obscured(&rel("srcs/a.php")));
        assert!(!listing.is_obscured(&rel("src")));

        let root_gone = VfsListing {
            files: vec![],
            unreadable: vec![None],
        };
        assert!(root_gone.is_obscured(&rel("anything.txt")));
    }

    #[tokio::test]
    async fn write_creates_parents_and_read_returns_bytes() {
        let runtime = Arc::new(MemoryRuntime::new());
        let store = VfsStore::new(runtime.clone(), "/project");

        runtime.make_directory("/project").await.unwrap();
        store.write(&rel("src/Http/Kernel.php"), b"<?php").await.unwrap();

        assert!(runtime.is_directory("/project/src/Http").await);
        assert_eq!(store.read(&rel("src/Http/Kernel.php")).await.unwrap(), b"<?php");
    }

    #[tokio::test]
    async fn write_creates_missing_nested_root() {
        let runtime = Arc::new(MemoryRuntime::new());
        let store = VfsStore::new(runtime.clone(), "/srv/app");

        store.write(&rel("index.php"), b"i").await.unwrap();

        assert!(runtime.is_directory("/srv").await);
        assert!(runtime.is_directory("/srv/app").await);
        assert_eq!(runtime.file("/srv/app/index.php").unwrap(), b"i");
    }

    #[tokio::test]
    async fn enumerate_recurses_and_filters() {
        let runtime = Arc::new(MemoryRuntime::new());
        let store = VfsStore::new(runtime.clone(), "/");
        for (path, body) in [
            ("index.php", "i"),
            ("src/a.php", "a"),
            ("src/lib/b.php", "b"),
            ("vendor/pkg/x.php", "x"),
        ] {
            store.write(&rel(path), body.as_bytes()).await.unwrap();
        }

        let listing = store.enumerate(&PathPolicy::default()).await;

        assert_eq!(
            listing.files,
            vec![rel("index.php"), rel("src/a.php"), rel("src/lib/b.php")]
        );
        assert!(listing.unreadable.is_empty());
    }

    #[tokio::test]
    async fn missing_root_yields_obscured_empty_listing() {
        let runtime = Arc::new(MemoryRuntime::new());
        let store = VfsStore::new(runtime, "/absent");

        let listing = store.enumerate(&PathPolicy::default()).await;

        assert!(listing.files.is_empty());
        assert_eq!(listing.unreadable, vec![None]);
    }

    #[tokio::test]
    async fn read_missing_is_not_found() {
        let store = VfsStore::new(Arc::new(MemoryRuntime::new()), "/");
        let err = store.read(&rel("nope.txt")).await.unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[test]
    fn root_is_normalized() {
        let runtime: Arc<dyn VfsRuntime> = Arc::new(MemoryRuntime::new());
        assert_eq!(VfsStore::new(runtime.clone(), "").root(), "/");
        assert_eq!(VfsStore::new(runtime.clone(), "project/").root(), "/project");
        assert_eq!(VfsStore::new(runtime, "/app").root(), "/app");
    }
}
