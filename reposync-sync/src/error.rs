//! Reasons a sync job stops early.
//!
//! None of these propagate as `Err` out of the orchestrator: the `Display`
//! text becomes the repository's status summary and the first failure line of
//! its log, followed by the raw command report when there is one.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use reposync_git::{GitFailure, OngoingOperation};

/// Guidance appended to the log when a rebase stops on conflicts.
pub const REBASE_GUIDANCE: &str = "Rebasing failed. There are likely conflicting changes. \
Resolve them and finish the rebase before trying again.";

/// Coarse classification of a [`JobFailure`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The repository entry itself is unusable.
    Configuration,
    /// An interrupted git operation makes an automated sync unsafe.
    SafetyAbort,
    /// Branch or remote could not be resolved.
    Detection,
    /// A git command exited with an error or crashed.
    Command,
    /// Git succeeded but the repository is not in the expected state.
    Invariant,
}

#[derive(Debug, Error)]
pub enum JobFailure {
    #[error("Path empty")]
    PathEmpty,

    #[error("Path is not a Git repo.")]
    NotARepository,

    #[error("Unsafe to sync, operation ongoing: {}.", ongoing_labels(.0))]
    OperationOngoing(OngoingOperation),

    #[error("Could not detect current branch. Possibly detached head.")]
    BranchNotDetected(Option<GitFailure>),

    #[error("Could not get URL for remote: {remote}. Check if remote exists.")]
    RemoteUrlUnknown {
        remote: String,
        failure: Option<GitFailure>,
    },

    #[error("Git error occurred while checking if repo is modified")]
    Status(GitFailure),

    #[error("Git error occurred while adding all")]
    AddAll(GitFailure),

    #[error("Git error occurred while committing")]
    Commit(GitFailure),

    #[error("Repo is still unclean after commit.")]
    StillUnclean,

    #[error("Git error occurred while fetching.")]
    Fetch(GitFailure),

    #[error("Git error while comparing:")]
    Compare(GitFailure),

    #[error("No relation between remote and HEAD. Aborting.")]
    NoUpstream,

    #[error("Git error while pushing:")]
    Push(GitFailure),

    #[error("Git error while merging:")]
    Merge(GitFailure),

    #[error("Git error while rebasing.")]
    Rebase(GitFailure),

    #[error("We are not ahead. Something may have gone wrong with the rebase.")]
    NotAheadAfterRebase,
}

impl JobFailure {
    pub fn kind(&self) -> FailureKind {
        match self {
            JobFailure::PathEmpty | JobFailure::NotARepository => FailureKind::Configuration,
            JobFailure::OperationOngoing(_) => FailureKind::SafetyAbort,
            JobFailure::BranchNotDetected(_) | JobFailure::RemoteUrlUnknown { .. } => {
                FailureKind::Detection
            }
            JobFailure::StillUnclean
            | JobFailure::NoUpstream
            | JobFailure::NotAheadAfterRebase => FailureKind::Invariant,
            _ => FailureKind::Command,
        }
    }

    /// The failed command, when the failure came from one.
    pub fn command_failure(&self) -> Option<&GitFailure> {
        match self {
            JobFailure::BranchNotDetected(failure)
            | JobFailure::RemoteUrlUnknown { failure, .. } => failure.as_ref(),
            JobFailure::Status(failure)
            | JobFailure::AddAll(failure)
            | JobFailure::Commit(failure)
            | JobFailure::Fetch(failure)
            | JobFailure::Compare(failure)
            | JobFailure::Push(failure)
            | JobFailure::Merge(failure)
            | JobFailure::Rebase(failure) => Some(failure),
            _ => None,
        }
    }

    pub fn detail(&self) -> Option<String> {
        self.command_failure().map(GitFailure::report)
    }

    /// Extra remediation line logged after the detail.
    pub fn guidance(&self) -> Option<&'static str> {
        match self {
            JobFailure::Rebase(_) => Some(REBASE_GUIDANCE),
            _ => None,
        }
    }
}

fn ongoing_labels(ongoing: &OngoingOperation) -> String {
    let labels = ongoing.labels();
    if labels.is_empty() {
        "unknown".to_string()
    } else {
        labels.join(", ")
    }
}
