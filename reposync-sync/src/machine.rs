//! The sync step machine.
//!
//! Each step is split at its external commands. [`begin_step`] runs the
//! filesystem-only part of the current state and either finishes, moves to the
//! next state, or asks for one git command. [`resume_step`] consumes that
//! command's result and does the same. Neither function blocks or spawns; the
//! caller decides where commands run.
//!
//! ```text
//! 0 Init ─► 1 CheckOngoing ─► 2 BranchRemote ─► 3 Commit ─► 4 Fetch ─► 5 Compare
//!                                                                     │ Equal: done
//!                                                                     │ Ahead: push, done
//!                                                                     │ Behind: ff-merge, done
//!                                                                     └ Diverged: rebase
//!                                          7 PushAfterRebase ◄─ 6 CompareAfterRebase
//! ```

use reposync_git::{parse, probe, CommandResult, CompareOutcome, GitOp};

use crate::error::JobFailure;
use crate::job::{Awaiting, JobState, Outcome, SyncJob, DEFAULT_REMOTE};
use crate::runtime::RepositoryRuntime;

/// What the caller must do after a step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Run this command for the job's repository and hand the result to
    /// [`resume_step`].
    Execute(GitOp),
    /// `job.state` moved forward; schedule another turn.
    Next,
    /// The job reached a terminal state.
    Finished(Outcome),
}

/// Inputs that are not per-repository.
#[derive(Debug, Clone, Copy)]
pub struct StepContext<'a> {
    pub client_name: &'a str,
}

/// Automatic commit message for `client_name`.
pub fn commit_message(client_name: &str) -> String {
    format!("Changes from {client_name}")
}

// ---------------------------------------------------------------------------
// Entering a state
// ---------------------------------------------------------------------------

/// Enter `job.state`. Must not be called while the job is waiting on a command.
pub fn begin_step(job: &mut SyncJob, rt: &mut RepositoryRuntime) -> Transition {
    debug_assert!(job.awaiting.is_none(), "begin_step on a waiting job");
    job.steps += 1;

    if job.state == JobState::Init {
        rt.reset_log();
    }
    rt.log(format!("Step {}", job.state));
    tracing::debug!("[{}] entering step {}", job.repo, job.state);

    match job.state {
        JobState::Init => {
            if rt.config.path.as_os_str().is_empty() {
                return fail(job, rt, JobFailure::PathEmpty);
            }
            if !probe::is_repository(&rt.config.path) {
                return fail(job, rt, JobFailure::NotARepository);
            }
            advance(job, JobState::CheckOngoing)
        }
        JobState::CheckOngoing => {
            let ongoing = probe::ongoing_operation(&rt.config.path);
            if !ongoing.is_none() {
                return fail(job, rt, JobFailure::OperationOngoing(ongoing));
            }
            advance(job, JobState::BranchRemote)
        }
        JobState::BranchRemote => request(job, Awaiting::CurrentBranch, GitOp::CurrentBranch),
        JobState::Commit => {
            if probe::is_bare(&rt.config.path) {
                rt.log("Repo has not been modified locally.");
                return advance(job, JobState::Fetch);
            }
            request(job, Awaiting::Status, GitOp::Status)
        }
        JobState::Fetch => {
            rt.log("Fetching...");
            let op = GitOp::Fetch {
                remote: job.remote.clone(),
                branch: job.branch.clone(),
            };
            request(job, Awaiting::Fetch, op)
        }
        JobState::Compare => {
            let op = GitOp::CompareWithHead {
                reference: job.upstream(),
            };
            request(job, Awaiting::Compare, op)
        }
        JobState::CompareAfterRebase => {
            let op = GitOp::CompareWithHead {
                reference: job.upstream(),
            };
            request(job, Awaiting::CompareAfterRebase, op)
        }
        JobState::PushAfterRebase => {
            let op = push(job);
            request(job, Awaiting::PushAfterRebase, op)
        }
    }
}

// ---------------------------------------------------------------------------
// Consuming a command result
// ---------------------------------------------------------------------------

/// Feed the result of the command requested by the last transition.
///
/// A result delivered to a job that is not waiting is ignored with a warning
/// and yields [`Transition::Next`] so the caller re-enters the current state.
pub fn resume_step(
    job: &mut SyncJob,
    rt: &mut RepositoryRuntime,
    ctx: &StepContext<'_>,
    result: CommandResult,
) -> Transition {
    let Some(awaiting) = job.awaiting.take() else {
        tracing::warn!("[{}] unexpected command result: {}", job.repo, result.command);
        return Transition::Next;
    };

    match awaiting {
        Awaiting::CurrentBranch => match parse::current_branch(result) {
            Ok(Some(branch)) => {
                rt.log(format!("Detected current branch: {branch}"));
                rt.branch = Some(branch.clone());
                job.branch = branch;
                job.remote = DEFAULT_REMOTE.to_string();
                rt.remote = Some(job.remote.clone());
                let op = GitOp::RemoteUrl {
                    remote: job.remote.clone(),
                };
                request(job, Awaiting::RemoteUrl, op)
            }
            Ok(None) => fail(job, rt, JobFailure::BranchNotDetected(None)),
            Err(failure) => fail(job, rt, JobFailure::BranchNotDetected(Some(failure))),
        },

        Awaiting::RemoteUrl => match parse::remote_url(result) {
            Ok(Some(url)) => {
                rt.log(format!("Remote {}: {url}", job.remote));
                rt.remote_url = Some(url);
                advance(job, JobState::Commit)
            }
            outcome => {
                let failure = JobFailure::RemoteUrlUnknown {
                    remote: job.remote.clone(),
                    failure: outcome.err(),
                };
                fail(job, rt, failure)
            }
        },

        Awaiting::Status => match parse::is_modified(result) {
            Ok(false) => {
                rt.log("Repo has not been modified locally.");
                advance(job, JobState::Fetch)
            }
            Ok(true) => {
                rt.log("Repo has been modified locally.");
                rt.log("Committing local changes...");
                request(job, Awaiting::AddAll, GitOp::AddAll)
            }
            Err(failure) => fail(job, rt, JobFailure::Status(failure)),
        },

        Awaiting::AddAll => match parse::completed(result) {
            Ok(()) => {
                let op = GitOp::Commit {
                    message: commit_message(ctx.client_name),
                };
                request(job, Awaiting::Commit, op)
            }
            Err(failure) => fail(job, rt, JobFailure::AddAll(failure)),
        },

        Awaiting::Commit => match parse::completed(result) {
            Ok(()) => request(job, Awaiting::StatusAfterCommit, GitOp::Status),
            Err(failure) => fail(job, rt, JobFailure::Commit(failure)),
        },

        Awaiting::StatusAfterCommit => match parse::is_modified(result) {
            Ok(false) => {
                rt.log("Repo clean after commit.");
                advance(job, JobState::Fetch)
            }
            Ok(true) => fail(job, rt, JobFailure::StillUnclean),
            Err(failure) => fail(job, rt, JobFailure::Status(failure)),
        },

        Awaiting::Fetch => match parse::completed(result) {
            Ok(()) => advance(job, JobState::Compare),
            Err(failure) => fail(job, rt, JobFailure::Fetch(failure)),
        },

        Awaiting::Compare => match parse::compare_outcome(result) {
            Ok(CompareOutcome::NoUpstream) => fail(job, rt, JobFailure::NoUpstream),
            Ok(CompareOutcome::Equal) => succeed(rt, "In sync! Done."),
            Ok(CompareOutcome::Ahead) => {
                rt.log("Ahead of remote. Pushing changes...");
                let op = push(job);
                request(job, Awaiting::Push, op)
            }
            Ok(CompareOutcome::Behind) => {
                rt.log("Behind remote. Fast-forwarding...");
                let op = GitOp::FastForwardMerge {
                    remote: job.remote.clone(),
                    branch: job.branch.clone(),
                };
                request(job, Awaiting::Merge, op)
            }
            Ok(CompareOutcome::Diverged) => {
                rt.log("Diverged from remote. Rebasing...");
                let op = GitOp::Rebase {
                    remote: job.remote.clone(),
                    branch: job.branch.clone(),
                };
                request(job, Awaiting::Rebase, op)
            }
            Err(failure) => fail(job, rt, JobFailure::Compare(failure)),
        },

        Awaiting::Push | Awaiting::PushAfterRebase => match parse::completed(result) {
            Ok(()) => succeed(rt, "Pushed successfully. In sync! Done."),
            Err(failure) => fail(job, rt, JobFailure::Push(failure)),
        },

        Awaiting::Merge => match parse::completed(result) {
            Ok(()) => succeed(rt, "Merged successfully. In sync! Done."),
            Err(failure) => fail(job, rt, JobFailure::Merge(failure)),
        },

        Awaiting::Rebase => match parse::completed(result) {
            Ok(()) => advance(job, JobState::CompareAfterRebase),
            Err(failure) => fail(job, rt, JobFailure::Rebase(failure)),
        },

        Awaiting::CompareAfterRebase => match parse::compare_outcome(result) {
            Ok(CompareOutcome::Ahead) => {
                rt.log("We are ahead. Rebase went fine. Pushing...");
                advance(job, JobState::PushAfterRebase)
            }
            Ok(_) => fail(job, rt, JobFailure::NotAheadAfterRebase),
            Err(failure) => fail(job, rt, JobFailure::Compare(failure)),
        },
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn advance(job: &mut SyncJob, next: JobState) -> Transition {
    job.state = next;
    Transition::Next
}

fn request(job: &mut SyncJob, awaiting: Awaiting, op: GitOp) -> Transition {
    job.awaiting = Some(awaiting);
    Transition::Execute(op)
}

fn push(job: &SyncJob) -> GitOp {
    GitOp::Push {
        remote: job.remote.clone(),
        branch: job.branch.clone(),
    }
}

fn succeed(rt: &mut RepositoryRuntime, line: &str) -> Transition {
    rt.log(line);
    rt.ok = true;
    Transition::Finished(Outcome::Success)
}

fn fail(job: &mut SyncJob, rt: &mut RepositoryRuntime, failure: JobFailure) -> Transition {
    job.failure = Some(failure.kind());
    tracing::info!(
        "[{}] sync failed ({:?}): {failure}",
        rt.name(),
        failure.kind()
    );
    rt.log_failure(&failure);
    Transition::Finished(Outcome::Failure)
}
