//! The per-operation git API: each method issues exactly one command through
//! a [`CommandExecutor`] and maps the result onto a typed value, or a
//! [`GitFailure`] carrying the raw result.
//!
//! The sync state machine builds on the same [`GitOp`] and [`parse`] pieces
//! but hands each op to the worker instead of blocking here. This type is for
//! callers already off the control path, such as `reposync repo add`.

use std::path::Path;

use crate::executor::CommandExecutor;
use crate::ops::GitOp;
use crate::parse::{self, CompareOutcome, GitFailure};
use crate::probe;

pub struct GitRepo<'a, E: CommandExecutor + ?Sized> {
    path: &'a Path,
    executor: &'a E,
}

impl<'a, E: CommandExecutor + ?Sized> GitRepo<'a, E> {
    pub fn new(path: &'a Path, executor: &'a E) -> Self {
        Self { path, executor }
    }

    pub fn path(&self) -> &Path {
        self.path
    }

    pub fn is_repository(&self) -> bool {
        probe::is_repository(self.path)
    }

    pub fn is_bare(&self) -> bool {
        probe::is_bare(self.path)
    }

    /// Bare repositories have no working tree and are never modified; no
    /// command is issued for them.
    pub fn is_modified(&self) -> Result<bool, GitFailure> {
        if self.is_bare() {
            return Ok(false);
        }
        parse::is_modified(self.run(&GitOp::Status))
    }

    pub fn current_branch(&self) -> Result<Option<String>, GitFailure> {
        parse::current_branch(self.run(&GitOp::CurrentBranch))
    }

    pub fn remote_url(&self, remote: &str) -> Result<Option<String>, GitFailure> {
        parse::remote_url(self.run(&GitOp::RemoteUrl {
            remote: remote.to_string(),
        }))
    }

    pub fn compare_with_head(&self, reference: &str) -> Result<CompareOutcome, GitFailure> {
        parse::compare_outcome(self.run(&GitOp::CompareWithHead {
            reference: reference.to_string(),
        }))
    }

    /// `add -A` then `commit -m <message>`; stops at the first failure.
    pub fn commit_all(&self, message: &str) -> Result<(), GitFailure> {
        parse::completed(self.run(&GitOp::AddAll))?;
        parse::completed(self.run(&GitOp::Commit {
            message: message.to_string(),
        }))
    }

    pub fn fetch(&self, remote: &str, branch: &str) -> Result<(), GitFailure> {
        parse::completed(self.run(&GitOp::Fetch {
            remote: remote.to_string(),
            branch: branch.to_string(),
        }))
    }

    pub fn push_branch(&self, remote: &str, branch: &str) -> Result<(), GitFailure> {
        parse::completed(self.run(&GitOp::Push {
            remote: remote.to_string(),
            branch: branch.to_string(),
        }))
    }

    pub fn fast_forward_merge(&self, remote: &str, branch: &str) -> Result<(), GitFailure> {
        parse::completed(self.run(&GitOp::FastForwardMerge {
            remote: remote.to_string(),
            branch: branch.to_string(),
        }))
    }

    pub fn rebase(&self, remote: &str, branch: &str) -> Result<(), GitFailure> {
        parse::completed(self.run(&GitOp::Rebase {
            remote: remote.to_string(),
            branch: branch.to_string(),
        }))
    }

    fn run(&self, op: &GitOp) -> crate::executor::CommandResult {
        self.executor.execute(self.path, op)
    }
}
