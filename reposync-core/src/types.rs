//! Configuration types for reposync.
//!
//! All path fields use `PathBuf`; never `&str` or `String` for filesystem paths.
//! All types are serializable/deserializable via serde + serde_yaml.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Refresh interval applied to repositories whose entry omits one.
pub const DEFAULT_REFRESH_INTERVAL_MINUTES: u32 = 60;

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// Display name of a configured repository. Unique within [`Settings::repos`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RepoName(pub String);

impl RepoName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RepoName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for RepoName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for RepoName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Domain structs
// ---------------------------------------------------------------------------

/// One configured repository working copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryConfig {
    pub name: RepoName,
    /// Working copy (or bare repository) root on disk.
    pub path: PathBuf,
    /// Minutes between automatic syncs; `0` disables auto-refresh.
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_minutes: u32,
}

impl RepositoryConfig {
    pub fn new(name: impl Into<RepoName>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            refresh_interval_minutes: DEFAULT_REFRESH_INTERVAL_MINUTES,
        }
    }

    pub fn with_interval(mut self, minutes: u32) -> Self {
        self.refresh_interval_minutes = minutes;
        self
    }

    /// `None` when auto-refresh is disabled.
    pub fn refresh_interval(&self) -> Option<Duration> {
        match self.refresh_interval_minutes {
            0 => None,
            minutes => Some(Duration::from_secs(u64::from(minutes) * 60)),
        }
    }
}

/// Root of the settings file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Settings {
    /// Attribution used in automatic commit messages.
    #[serde(default)]
    pub client_name: String,
    /// Overrides the platform default git binary.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git_command: Option<PathBuf>,
    #[serde(default)]
    pub repos: Vec<RepositoryConfig>,
}

impl Settings {
    pub fn repo(&self, name: &RepoName) -> Option<&RepositoryConfig> {
        self.repos.iter().find(|r| &r.name == name)
    }

    pub fn repo_mut(&mut self, name: &RepoName) -> Option<&mut RepositoryConfig> {
        self.repos.iter_mut().find(|r| &r.name == name)
    }

    /// The configured client name, or `<hostname>/<username>` when unset.
    pub fn effective_client_name(&self) -> String {
        let trimmed = self.client_name.trim();
        if trimmed.is_empty() {
            default_client_name()
        } else {
            trimmed.to_string()
        }
    }
}

/// `<hostname>/<username>` for the current machine.
pub fn default_client_name() -> String {
    let hostname = whoami::fallible::hostname().unwrap_or_else(|_| "unknown".into());
    format!("{hostname}/{}", whoami::username())
}

fn default_refresh_interval() -> u32 {
    DEFAULT_REFRESH_INTERVAL_MINUTES
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
