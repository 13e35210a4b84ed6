//! Error types for reposync-core.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::RepoName;

/// All errors that can arise from settings operations.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// Underlying I/O failure (permission denied, read-only filesystem, etc.).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization error (save path).
    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// YAML parse error on load; includes file path and line context from serde_yaml.
    #[error("failed to parse settings at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// `dirs::home_dir()` returned `None`: cannot locate `~/.reposync/`.
    #[error("cannot determine home directory; set $HOME or equivalent")]
    HomeNotFound,

    #[error("a repository named '{name}' is already configured")]
    DuplicateRepo { name: RepoName },

    #[error("no repository named '{name}' is configured")]
    RepoNotFound { name: RepoName },
}
