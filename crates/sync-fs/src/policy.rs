//! Which paths participate in sync.

use std::collections::BTreeSet;

use crate::{ExcludedDir, RelativePath};

/// Exclusion rules applied identically to both stores.
///
/// A path is skipped iff its first segment is in the exclusion set, so an
/// excluded subtree never enters either snapshot map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPolicy {
    excluded: BTreeSet<String>,
}

impl PathPolicy {
    /// Build a policy from an explicit set of top-level directory names.
    pub fn new<I, S>(excluded: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            excluded: excluded.into_iter().map(Into::into).collect(),
        }
    }

    pub fn should_skip(&self, path: &RelativePath) -> bool {
        self.excluded.contains(path.first_segment())
    }

}

impl Default for PathPolicy {
    fn default() -> Self {
        Self::new(ExcludedDir::ALL.iter().map(ExcludedDir::as_str))
    }
}
