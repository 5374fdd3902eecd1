//! Native-filesystem implementation of [`LocalStore`]

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use sync_fs::io::{self as fsio, RobustnessConfig};
use sync_fs::{PathPolicy, RelativePath};

use super::{LocalEntry, LocalStore, Timestamp};
use crate::{Error, Result};

/// A granted directory on the native filesystem.
#[derive(Debug, Clone)]
pub struct LocalDirectory {
    root: PathBuf,
    robustness: RobustnessConfig,
}

impl LocalDirectory {
    /// Open a directory grant, resolving it to a canonical path.
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let requested = root.as_ref();
        let root = dunce::canonicalize(requested).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => Error::NotFound {
                path: requested.display().to_string(),
            },
            io::ErrorKind::PermissionDenied => Error::permission_revoked(requested.display(), &e),
            _ => Error::Fs(sync_fs::Error::io(requested, e)),
        })?;

        if !root.is_dir() {
            return Err(Error::Fs(sync_fs::Error::io(
                &root,
                io::Error::from(io::ErrorKind::NotADirectory),
            )));
        }

        Ok(Self {
            root,
            robustness: RobustnessConfig::default(),
        })
    }

    pub fn with_robustness(mut self, robustness: RobustnessConfig) -> Self {
        self.robustness = robustness;
        self
    }

    fn native(&self, path: &RelativePath) -> PathBuf {
        path.to_native(&self.root)
    }

    /// A permission failure on one entry only revokes the session when the
    /// root itself has become inaccessible.
    async fn root_revoked(&self) -> bool {
        matches!(
            tokio::fs::read_dir(&self.root).await,
            Err(e) if e.kind() == io::ErrorKind::PermissionDenied
        )
    }

    async fn read_error(&self, path: &RelativePath, source: io::Error) -> Error {
        if source.kind() == io::ErrorKind::PermissionDenied && self.root_revoked().await {
            return Error::permission_revoked(self.root.display(), &source);
        }
        match source.kind() {
            io::ErrorKind::NotFound => Error::NotFound {
                path: path.to_string(),
            },
            _ => Error::ReadFailure {
                path: path.to_string(),
                source,
            },
        }
    }

    /// Classify a directory that could not be listed during a walk.
    ///
    /// `Ok` skips the directory. Only failures on the root abort the walk,
    /// except for a vanished root which lists as empty.
    async fn unlisted_dir(&self, dir: &Path, is_root: bool, source: io::Error) -> Result<()> {
        if source.kind() == io::ErrorKind::NotFound {
            tracing::debug!(dir = %dir.display(), "Directory vanished mid-walk");
            return Ok(());
        }
        if source.kind() == io::ErrorKind::PermissionDenied
            && (is_root || self.root_revoked().await)
        {
            return Err(Error::permission_revoked(self.root.display(), &source));
        }
        if is_root {
            return Err(Error::ReadFailure {
                path: dir.display().to_string(),
                source,
            });
        }
        tracing::warn!(dir = %dir.display(), "Skipping unreadable directory: {}", source);
        Ok(())
    }

    async fn write_error(&self, path: &RelativePath, source: io::Error) -> Error {
        if source.kind() == io::ErrorKind::PermissionDenied && self.root_revoked().await {
            return Error::permission_revoked(self.root.display(), &source);
        }
        Error::WriteFailure {
            path: path.to_string(),
            source,
        }
    }
}

fn timestamp(metadata: &std::fs::Metadata) -> io::Result<Timestamp> {
    metadata.modified().map(Timestamp::from)
}

#[async_trait]
impl LocalStore for LocalDirectory {
    fn root(&self) -> &Path {
        &self.root
    }

    async fn enumerate(&self, policy: &PathPolicy) -> Result<Vec<LocalEntry>> {
        let mut entries = Vec::new();
        let mut pending: Vec<(PathBuf, Option<RelativePath>)> = vec![(self.root.clone(), None)];

        while let Some((dir, prefix)) = pending.pop() {
            let mut reader = match tokio::fs::read_dir(&dir).await {
                Ok(reader) => reader,
                Err(e) => {
                    self.unlisted_dir(&dir, prefix.is_none(), e).await?;
                    continue;
                }
            };

            loop {
                let entry = match reader.next_entry().await {
                    Ok(Some(entry)) => entry,
                    Ok(None) => break,
                    Err(e) => {
                        tracing::warn!(dir = %dir.display(), "Directory listing interrupted: {}", e);
                        break;
                    }
                };

                let name = entry.file_name().to_string_lossy().into_owned();
                if fsio::is_staging_file(&name) {
                    continue;
                }

                let rel = match &prefix {
                    Some(parent) => parent.join(&name),
                    None => RelativePath::parse(&name),
                };
                let rel = match rel {
                    Ok(rel) => rel,
                    Err(e) => {
                        tracing::warn!("Skipping unrepresentable entry {:?}: {}", name, e);
                        continue;
                    }
                };
                if policy.should_skip(&rel) {
                    tracing::trace!(path = %rel, "Excluded by policy");
                    continue;
                }

                // Symlinked directories are not followed
                let file_type = match entry.file_type().await {
                    Ok(t) => t,
                    Err(e) => {
                        tracing::debug!(path = %rel, "Entry vanished during walk: {}", e);
                        continue;
                    }
                };
                if file_type.is_dir() {
                    pending.push((entry.path(), Some(rel)));
                    continue;
                }

                let metadata = match tokio::fs::metadata(entry.path()).await {
                    Ok(m) if m.is_file() => m,
                    Ok(_) => continue,
                    Err(e) => {
                        tracing::debug!(path = %rel, "Entry vanished during walk: {}", e);
                        continue;
                    }
                };
                match timestamp(&metadata) {
                    Ok(modified) => entries.push(LocalEntry {
                        path: rel,
                        modified,
                    }),
                    Err(e) => tracing::warn!(path = %rel, "No modification time: {}", e),
                }
            }
        }

        entries.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(entries)
    }

    async fn read(&self, path: &RelativePath) -> Result<Vec<u8>> {
        match tokio::fs::read(self.native(path)).await {
            Ok(bytes) => Ok(bytes),
            Err(e) => Err(self.read_error(path, e).await),
        }
    }

    async fn write(&self, path: &RelativePath, bytes: &[u8]) -> Result<()> {
        let native = self.native(path);
        let content = bytes.to_vec();
        let robustness = self.robustness;

        let written = tokio::task::spawn_blocking(move || {
            fsio::write_atomic(&native, &content, robustness)
        })
        .await
        .map_err(|e| Error::WriteFailure {
            path: path.to_string(),
            source: io::Error::other(e),
        })?;

        match written {
            Ok(()) => Ok(()),
            Err(e) => Err(self.write_error(path, Error::into_io(e)).await),
        }
    }

    async fn modified(&self, path: &RelativePath) -> Result<Timestamp> {
        let metadata = match tokio::fs::metadata(self.native(path)).await {
            Ok(m) => m,
            Err(e) => return Err(self.read_error(path, e).await),
        };
        match timestamp(&metadata) {
            Ok(ts) => Ok(ts),
            Err(e) => Err(self.read_error(path, e).await),
        }
    }

    async fn remove(&self, path: &RelativePath) -> Result<()> {
        let native = self.native(path);
        let removed = tokio::task::spawn_blocking(move || fsio::remove_all(&native))
            .await
            .map_err(|e| Error::WriteFailure {
                path: path.to_string(),
                source: io::Error::other(e),
            })?;

        match removed {
            Ok(()) => Ok(()),
            Err(e) => Err(self.write_error(path, Error::into_io(e)).await),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn rel(s: &str) -> RelativePath {
        RelativePath::parse(s).unwrap()
    }

    #[tokio::test]
    async fn unlistable_subdirectory_is_skipped_but_root_is_not() {
        let temp = tempfile::tempdir().unwrap();
        let dir = LocalDirectory::open(temp.path()).unwrap();
        let sub = temp.path().join("src");

        dir.unlisted_dir(&sub, false, io::Error::from(io::ErrorKind::NotADirectory))
            .await
            .unwrap();
        dir.unlisted_dir(&sub, false, io::Error::other("i/o error"))
            .await
            .unwrap();
        dir.unlisted_dir(temp.path(), true, io::Error::from(io::ErrorKind::NotFound))
            .await
            .unwrap();

        let err = dir
            .unlisted_dir(temp.path(), true, io::Error::other("i/o error"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ReadFailure { .. }));
        let err = dir
            .unlisted_dir(
                temp.path(),
                true,
                io::Error::from(io::ErrorKind::PermissionDenied),
            )
            .await
            .unwrap_err();
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn enumerate_walks_nested_files_and_skips_policy() {
        let temp = tempfile::tempdir().unwrap();
        fs::create_dir_all(temp.path().join("src/deep")).unwrap();
        fs::create_dir_all(temp.path().join("vendor/pkg")).unwrap();
        fs::write(temp.path().join("index.php"), "i").unwrap();
        fs::write(temp.path().join("src/deep/a.php"), "a").unwrap();
        fs::write(temp.path().join("vendor/pkg/x.php"), "x").unwrap();

        let dir = LocalDirectory::open(temp.path()).unwrap();
        let paths: Vec<_> = dir
            .enumerate(&PathPolicy::default())
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.path.to_string())
            .collect();

        assert_eq!(paths, vec!["index.php", "src/deep/a.php"]);
    }

    #[tokio::test]
    async fn enumerate_ignores_staging_files() {
        let temp = tempfile::tempdir().unwrap();
        fs::write(temp.path().join("a.txt"), "a").unwrap();
        fs::write(temp.path().join(".a.txt.1.0.idesync-tmp"), "partial").unwrap();

        let dir = LocalDirectory::open(temp.path()).unwrap();
        let entries = dir.enumerate(&PathPolicy::default()).await.unwrap();

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].path, rel("a.txt"));
    }

    #[tokio::test]
    async fn enumerate_of_deleted_root_is_empty() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path().join("project");
        fs::create_dir(&root).unwrap();
        let dir = LocalDirectory::open(&root).unwrap();
        fs::remove_dir(&root).unwrap();

        assert!(dir.enumerate(&PathPolicy::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn read_after_delete_is_not_found() {
        let temp = tempfile::tempdir().unwrap();
        fs::write(temp.path().join("gone.txt"), "x").unwrap();
        let dir = LocalDirectory::open(temp.path()).unwrap();
        fs::remove_file(temp.path().join("gone.txt")).unwrap();

        let err = dir.read(&rel("gone.txt")).await.unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[tokio::test]
    async fn write_creates_parents_and_modified_reports_time() {
        let temp = tempfile::tempdir().unwrap();
        let dir = LocalDirectory::open(temp.path()).unwrap();

        dir.write(&rel("a/b/c.txt"), b"hello").await.unwrap();

        assert_eq!(fs::read(temp.path().join("a/b/c.txt")).unwrap(), b"hello");
        let modified = dir.modified(&rel("a/b/c.txt")).await.unwrap();
        let expected = fs::metadata(temp.path().join("a/b/c.txt"))
            .unwrap()
            .modified()
            .unwrap();
        assert_eq!(modified, Timestamp::from(expected));
    }

    #[tokio::test]
    async fn remove_is_recursive_and_idempotent() {
        let temp = tempfile::tempdir().unwrap();
        fs::create_dir_all(temp.path().join("dir/sub")).unwrap();
        fs::write(temp.path().join("dir/sub/f.txt"), "f").unwrap();
        let dir = LocalDirectory::open(temp.path()).unwrap();

        dir.remove(&rel("dir")).await.unwrap();
        dir.remove(&rel("dir")).await.unwrap();

        assert!(!temp.path().join("dir").exists());
    }

    #[test]
    fn open_missing_directory_is_not_found() {
        let temp = tempfile::tempdir().unwrap();
        let err = LocalDirectory::open(temp.path().join("nope")).unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[test]
    fn open_file_is_rejected() {
        let temp = tempfile::tempdir().unwrap();
        let file = temp.path().join("file.txt");
        fs::write(&file, "x").unwrap();
        assert!(LocalDirectory::open(&file).is_err());
    }
}
