//! Project-relative path handling
//!
//! `RelativePath` is the join key between the local directory and the
//! virtual project tree, so both sides must produce byte-identical keys
//! for the same file.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// A `/`-separated path relative to the project root.
///
/// Never carries a leading slash, never contains empty, `.` or `..`
/// segments. Equality is exact, case-sensitive string equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RelativePath {
    inner: String,
}

impl RelativePath {
    /// Parse and normalize a path.
    ///
    /// Backslashes become forward slashes, leading slashes and `.` segments
    /// are dropped, and repeated separators collapse. Paths containing `..`
    /// or resolving to the root itself are rejected.
    pub fn parse(path: impl AsRef<str>) -> Result<Self> {
        let raw = path.as_ref();
        let unified = raw.replace('\\', "/");

        let mut segments = Vec::new();
        for segment in unified.split('/') {
            match segment {
                "" | "." => continue,
                ".." => {
                    return Err(Error::InvalidPath {
                        path: raw.to_string(),
                        reason: "parent segments are not allowed".into(),
                    });
                }
                s => segments.push(s),
            }
        }

        if segments.is_empty() {
            return Err(Error::InvalidPath {
                path: raw.to_string(),
                reason: "path is empty".into(),
            });
        }

        Ok(Self {
            inner: segments.join("/"),
        })
    }

    /// Get the internal normalized string representation.
    pub fn as_str(&self) -> &str {
        &self.inner
    }

    /// The first path segment, used for exclusion decisions.
    pub fn first_segment(&self) -> &str {
        self.inner.split('/').next().unwrap_or(&self.inner)
    }

    /// Iterate over the path's segments.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.inner.split('/')
    }

    /// Join this path with a single child name.
    pub fn join(&self, child: &str) -> Result<Self> {
        Self::parse(format!("{}/{}", self.inner, child))
    }

    /// Get the parent directory, or `None` for a top-level entry.
    pub fn parent(&self) -> Option<Self> {
        self.inner.rfind('/').map(|idx| Self {
            inner: self.inner[..idx].to_string(),
        })
    }

    /// Get the file name component.
    pub fn file_name(&self) -> &str {
        self.inner.rsplit('/').next().unwrap_or(&self.inner)
    }

    /// Resolve this path beneath a native root directory.
    pub fn to_native(&self, root: &Path) -> PathBuf {
        self.segments().fold(root.to_path_buf(), |acc, s| acc.join(s))
    }

    /// Resolve this path beneath a `/`-separated virtual root such as `/project`.
    pub fn to_virtual(&self, root: &str) -> String {
        let root = root.trim_end_matches('/');
        format!("{}/{}", root, self.inner)
    }
}

impl AsRef<str> for RelativePath {
    fn as_ref(&self) -> &str {
        &self.inner
    }
}

impl fmt::Display for RelativePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.inner)
    }
}

impl TryFrom<&str> for RelativePath {
    type Error = Error;

    fn try_from(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for RelativePath {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        Self::parse(s)
    }
}

impl From<RelativePath> for String {
    fn from(p: RelativePath) -> Self {
        p.inner
    }
}
