//! In-memory [`VfsRuntime`]

use std::collections::BTreeMap;
use std::io;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tokio::sync::watch;

use super::VfsRuntime;

#[derive(Debug, Clone)]
enum Node {
    Dir,
    File(Vec<u8>),
}

/// A virtual tree held entirely in memory.
///
/// Stands in for the embedded runtime: directories and byte files keyed by
/// absolute virtual path, plus a version counter bumped on every file write
/// and removal.
#[derive(Debug)]
pub struct MemoryRuntime {
    nodes: Mutex<BTreeMap<String, Node>>,
    version: watch::Sender<u64>,
}

impl Default for MemoryRuntime {
    fn default() -> Self {
        Self::new()
    }
}

fn normalize(path: &str) -> String {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty() && *s != ".").collect();
    format!("/{}", segments.join("/"))
}

fn parent_of(path: &str) -> Option<&str> {
    match path.rfind('/') {
        Some(0) if path.len() > 1 => Some("/"),
        Some(0) | None => None,
        Some(idx) => Some(&path[..idx]),
    }
}

impl MemoryRuntime {
    pub fn new() -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert("/".to_string(), Node::Dir);
        let (version, _) = watch::channel(0);
        Self {
            nodes: Mutex::new(nodes),
            version,
        }
    }

    fn nodes(&self) -> MutexGuard<'_, BTreeMap<String, Node>> {
        self.nodes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn bump(&self) {
        self.version.send_modify(|v| *v += 1);
    }

    /// Current value of the write-version counter.
    pub fn current_version(&self) -> u64 {
        *self.version.borrow()
    }

    /// Snapshot of every file, keyed by virtual path.
    pub fn files(&self) -> BTreeMap<String, Vec<u8>> {
        self.nodes()
            .iter()
            .filter_map(|(path, node)| match node {
                Node::File(bytes) => Some((path.clone(), bytes.clone())),
                Node::Dir => None,
            })
            .collect()
    }

    /// Content of one file, if present.
    pub fn file(&self, path: &str) -> Option<Vec<u8>> {
        match self.nodes().get(&normalize(path)) {
            Some(Node::File(bytes)) => Some(bytes.clone()),
            _ => None,
        }
    }

    /// Write a file, creating parent directories as needed.
    ///
    /// Mirrors what an editor save or a shell command inside the runtime does.
    pub fn put(&self, path: &str, bytes: impl Into<Vec<u8>>) {
        let path = normalize(path);
        {
            let mut nodes = self.nodes();
            let mut cursor = parent_of(&path);
            while let Some(dir) = cursor {
                nodes.entry(dir.to_string()).or_insert(Node::Dir);
                cursor = parent_of(dir);
            }
            nodes.insert(path, Node::File(bytes.into()));
        }
        self.bump();
    }

    /// Remove a file or directory tree. Returns whether anything was removed.
    pub fn remove(&self, path: &str) -> bool {
        let path = normalize(path);
        let removed = {
            let mut nodes = self.nodes();
            let prefix = format!("{}/", path);
            let before = nodes.len();
            nodes.retain(|key, _| *key != path && !key.starts_with(&prefix));
            nodes.len() != before
        };
        if removed {
            self.bump();
        }
        removed
    }

    /// Copy every file below `dir` into the tree under `root`.
    pub fn seed_from_dir(&self, dir: &Path, root: &str) -> io::Result<usize> {
        let mut count = 0;
        let mut pending = vec![dir.to_path_buf()];
        while let Some(current) = pending.pop() {
            for entry in std::fs::read_dir(&current)? {
                let entry = entry?;
                let file_type = entry.file_type()?;
                if file_type.is_dir() {
                    pending.push(entry.path());
                } else if file_type.is_file() {
                    let rel = entry
                        .path()
                        .strip_prefix(dir)
                        .map_err(io::Error::other)?
                        .to_string_lossy()
                        .replace('\\', "/");
                    let target = format!("{}/{}", root.trim_end_matches('/'), rel);
                    self.put(&target, std::fs::read(entry.path())?);
                    count += 1;
                }
            }
        }
        Ok(count)
    }
}

#[async_trait]
impl VfsRuntime for MemoryRuntime {
    async fn list_files(&self, path: &str) -> io::Result<Vec<String>> {
        let path = normalize(path);
        let nodes = self.nodes();
        match nodes.get(&path) {
            Some(Node::Dir) => {}
            Some(Node::File(_)) => return Err(io::Error::from(io::ErrorKind::NotADirectory)),
            None => return Err(io::Error::from(io::ErrorKind::NotFound)),
        }

        let prefix = if path == "/" { path.clone() } else { format!("{}/", path) };
        Ok(nodes
            .range(prefix.clone()..)
            .take_while(|(key, _)| key.starts_with(&prefix))
            .filter_map(|(key, _)| {
                let rest = &key[prefix.len()..];
                (!rest.is_empty() && !rest.contains('/')).then(|| rest.to_string())
            })
            .collect())
    }

    async fn is_directory(&self, path: &str) -> bool {
        matches!(self.nodes().get(&normalize(path)), Some(Node::Dir))
    }

    async fn file_exists(&self, path: &str) -> bool {
        self.nodes().contains_key(&normalize(path))
    }

    async fn make_directory(&self, path: &str) -> io::Result<()> {
        let path = normalize(path);
        let mut nodes = self.nodes();
        if nodes.contains_key(&path) {
            return Err(io::Error::from(io::ErrorKind::AlreadyExists));
        }
        let parent_is_dir = matches!(parent_of(&path).and_then(|p| nodes.get(p)), Some(Node::Dir));
        if !parent_is_dir {
            return Err(io::Error::from(io::ErrorKind::NotFound));
        }
        nodes.insert(path, Node::Dir);
        Ok(())
    }

    async fn read_file_as_bytes(&self, path: &str) -> io::Result<Vec<u8>> {
        match self.nodes().get(&normalize(path)) {
            Some(Node::File(bytes)) => Ok(bytes.clone()),
            Some(Node::Dir) => Err(io::Error::from(io::ErrorKind::IsADirectory)),
            None => Err(io::Error::from(io::ErrorKind::NotFound)),
        }
    }

    async fn write_file(&self, path: &str, bytes: &[u8]) -> io::Result<()> {
        let path = normalize(path);
        {
            let mut nodes = self.nodes();
            let parent_is_dir =
                matches!(parent_of(&path).and_then(|p| nodes.get(p)), Some(Node::Dir));
            if !parent_is_dir {
                return Err(io::Error::from(io::ErrorKind::NotFound));
            }
            if matches!(nodes.get(&path), Some(Node::Dir)) {
                return Err(io::Error::from(io::ErrorKind::IsADirectory));
            }
            nodes.insert(path, Node::File(bytes.to_vec()));
        }
        self.bump();
        Ok(())
    }

    fn version(&self) -> watch::Receiver<u64> {
        self.version.subscribe()
    }
}
