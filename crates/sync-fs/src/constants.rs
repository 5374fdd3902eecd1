//! Directory names that never participate in synchronization.

/// Top-level directories excluded from sync on both sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExcludedDir {
    /// The `vendor` directory (installed PHP dependencies)
    Vendor,
    /// The `node_modules` directory (installed JS dependencies)
    NodeModules,
    /// The `.composer` directory (package-manager metadata)
    ComposerMeta,
    /// The `.git` directory (version control database)
    GitDir,
}

impl ExcludedDir {
    pub const ALL: [ExcludedDir; 4] = [
        Self::Vendor,
        Self::NodeModules,
        Self::ComposerMeta,
        Self::GitDir,
    ];

    /// Get the string representation of the directory name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Vendor => "vendor",
            Self::NodeModules => "node_modules",
            Self::ComposerMeta => ".composer",
            Self::GitDir => ".git",
        }
    }
}
