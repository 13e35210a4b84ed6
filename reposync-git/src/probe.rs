//! Filesystem-only repository classification.
//!
//! Nothing in this module spawns a process: every answer comes from the
//! entries at the top of the repository path (or of its git directory).
//! Checks are ordered by priority and the first match wins.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Set of interrupted git operations that make an automated sync unsafe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OngoingOperation(u8);

impl OngoingOperation {
    pub const NONE: Self = Self(0x00);
    pub const REBASE: Self = Self(0x01);
    pub const MERGE: Self = Self(0x02);
    pub const CHERRY_PICK: Self = Self(0x04);
    pub const BISECT: Self = Self(0x08);

    pub fn is_none(self) -> bool {
        self.0 == 0
    }

    pub fn contains(self, other: Self) -> bool {
        other.0 != 0 && self.0 & other.0 == other.0
    }

    /// Human labels of every operation in the set, in priority order.
    ///
    /// A non-empty set with no known bit yields `["unknown"]`.
    pub fn labels(self) -> Vec<&'static str> {
        let mut labels = Vec::new();
        for (flag, label) in [
            (Self::REBASE, "rebase"),
            (Self::MERGE, "merge"),
            (Self::CHERRY_PICK, "cherry-pick"),
            (Self::BISECT, "bisect"),
        ] {
            if self.contains(flag) {
                labels.push(label);
            }
        }
        if labels.is_empty() && !self.is_none() {
            labels.push("unknown");
        }
        labels
    }
}

impl std::ops::BitOr for OngoingOperation {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl fmt::Display for OngoingOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            return f.write_str("none");
        }
        f.write_str(&self.labels().join(", "))
    }
}

const BARE_MARKERS: [&str; 4] = ["objects", "refs", "config", "HEAD"];

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// `true` if `path` holds a `.git` entry or all four bare-repository markers.
///
/// Quick check only: a path that fails both is reported as "not a repository"
/// without asking git.
pub fn is_repository(path: &Path) -> bool {
    if path.as_os_str().is_empty() {
        return false;
    }
    has_entry(path, ".git") || has_bare_markers(path)
}

/// `true` if `path` looks like a bare repository: bare markers at the top level
/// and no `.git` entry.
pub fn is_bare(path: &Path) -> bool {
    !has_entry(path, ".git") && has_bare_markers(path)
}

/// Detect an interrupted operation from the control files in the git directory.
///
/// Priority order is rebase > merge > cherry-pick > bisect and only the first
/// match is reported, even when several markers coexist.
pub fn ongoing_operation(path: &Path) -> OngoingOperation {
    let Some(git_dir) = git_dir(path) else {
        return OngoingOperation::NONE;
    };

    if has_entry(&git_dir, "rebase-merge") || has_entry(&git_dir, "rebase-apply") {
        OngoingOperation::REBASE
    } else if has_entry(&git_dir, "MERGE_HEAD") {
        OngoingOperation::MERGE
    } else if has_entry(&git_dir, "CHERRY_PICK_HEAD") {
        OngoingOperation::CHERRY_PICK
    } else if has_entry(&git_dir, "BISECT_LOG") {
        OngoingOperation::BISECT
    } else {
        OngoingOperation::NONE
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn has_entry(dir: &Path, name: &str) -> bool {
    fs::symlink_metadata(dir.join(name)).is_ok()
}

fn has_bare_markers(path: &Path) -> bool {
    BARE_MARKERS.iter().all(|marker| has_entry(path, marker))
}

/// Resolve the git directory of a working tree.
///
/// `.git` is either the directory itself or, for linked worktrees and
/// submodules, a file of the form `gitdir: <path>`.
fn git_dir(path: &Path) -> Option<PathBuf> {
    let dot_git = path.join(".git");
    let meta = fs::metadata(&dot_git).ok()?;
    if meta.is_dir() {
        return Some(dot_git);
    }

    let contents = fs::read_to_string(&dot_git).ok()?;
    let target = contents.trim().strip_prefix("gitdir:")?.trim();
    let target = Path::new(target);
    Some(if target.is_absolute() {
        target.to_path_buf()
    } else {
        path.join(target)
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
