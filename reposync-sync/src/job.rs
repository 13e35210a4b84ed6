//! One run of the sync state machine for one repository.

use std::fmt;

use serde::{Deserialize, Serialize};

use reposync_core::RepoName;

use crate::error::FailureKind;

/// Remote every job syncs against.
pub const DEFAULT_REMOTE: &str = "origin";

/// Position of a job in the fixed step sequence. The discriminants are the
/// step ordinals shown in logs and reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Init = 0,
    CheckOngoing = 1,
    BranchRemote = 2,
    Commit = 3,
    Fetch = 4,
    Compare = 5,
    CompareAfterRebase = 6,
    PushAfterRebase = 7,
}

impl JobState {
    pub fn ordinal(self) -> u8 {
        self as u8
    }

    pub fn label(self) -> &'static str {
        match self {
            JobState::Init => "init",
            JobState::CheckOngoing => "check-ongoing",
            JobState::BranchRemote => "branch-remote",
            JobState::Commit => "commit",
            JobState::Fetch => "fetch",
            JobState::Compare => "compare",
            JobState::CompareAfterRebase => "compare-after-rebase",
            JobState::PushAfterRebase => "push-after-rebase",
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.ordinal(), self.label())
    }
}

/// The command a job has handed to the worker and is waiting on.
///
/// A job with `awaiting = Some(_)` cannot advance until the matching
/// [`reposync_git::CommandResult`] is delivered back to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Awaiting {
    CurrentBranch,
    RemoteUrl,
    Status,
    AddAll,
    Commit,
    StatusAfterCommit,
    Fetch,
    Compare,
    Push,
    Merge,
    Rebase,
    CompareAfterRebase,
    PushAfterRebase,
}

/// Identity of one job, unique for the life of an orchestrator. Command
/// results are matched to jobs by id, since the repository name can change
/// while a command is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub u64);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub struct SyncJob {
    pub id: JobId,
    pub repo: RepoName,
    pub state: JobState,
    pub awaiting: Option<Awaiting>,
    /// Resolved in step 2.
    pub branch: String,
    pub remote: String,
    /// Number of steps entered so far, including the current one.
    pub steps: u32,
    /// Number of external commands issued so far.
    pub commands: u32,
    /// Set when the job stops on a failure.
    pub failure: Option<FailureKind>,
    /// The repository left the configuration while this job was at the
    /// front. The job only waits for its in-flight result, then is dropped.
    pub detached: bool,
}

impl SyncJob {
    pub fn new(id: JobId, repo: RepoName) -> Self {
        Self {
            id,
            repo,
            state: JobState::Init,
            awaiting: None,
            branch: String::new(),
            remote: String::new(),
            steps: 0,
            commands: 0,
            failure: None,
            detached: false,
        }
    }

    /// `remote/branch`, the upstream ref compared against and integrated from.
    pub fn upstream(&self) -> String {
        format!("{}/{}", self.remote, self.branch)
    }

    pub fn is_waiting(&self) -> bool {
        self.awaiting.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Success,
    Failure,
}

/// Summary of a finished job, emitted once per job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobReport {
    pub repo: RepoName,
    pub outcome: Outcome,
    /// State the job was in when it finished.
    pub final_state: JobState,
    pub steps: u32,
    pub commands: u32,
    pub failure_kind: Option<FailureKind>,
    pub summary: String,
}
