//! Job queue and scheduler.
//!
//! The [`Orchestrator`] is a plain single-threaded value: it never blocks,
//! spawns, sleeps, or runs a command. Every method records what must happen
//! next as [`Directive`]s, which the owner drains with
//! [`Orchestrator::take_directives`] and carries out (post a turn, hand a
//! command to the worker, arm a timer, publish a snapshot).
//!
//! Invariants:
//! - at most one job per repository exists in the queue
//! - only the front job ever advances, one state per turn
//! - jobs leave the queue in arrival order
//! - a command result reaches only the job that requested it, matched by
//!   [`JobId`]

use std::collections::{HashSet, VecDeque};
use std::path::PathBuf;
use std::time::Duration;

use chrono::Local;

use reposync_core::{RepoName, RepositoryConfig, Settings};
use reposync_git::{CommandResult, GitOp};

use crate::job::{JobId, JobReport, JobState, Outcome, SyncJob};
use crate::machine::{self, StepContext, Transition};
use crate::runtime::RepositoryRuntime;
use crate::snapshot::{OverallStatus, RepoSnapshot};

/// Work the owner of an [`Orchestrator`] must carry out.
#[derive(Debug, Clone, PartialEq)]
pub enum Directive {
    /// Post one call to [`Orchestrator::turn`] onto the control event queue.
    ScheduleTurn,
    /// Run `op` in `workdir` off the control context and deliver the result
    /// to [`Orchestrator::command_finished`] with this `job` id.
    Execute {
        job: JobId,
        repo: RepoName,
        workdir: PathBuf,
        op: GitOp,
    },
    /// (Re)start the repository's timer. On expiry call
    /// [`Orchestrator::timer_fired`] with this generation.
    ArmTimer {
        repo: RepoName,
        generation: u64,
        after: Duration,
    },
    CancelTimer { repo: RepoName },
    StateChanged(RepoSnapshot),
    /// The repository left the configuration.
    Removed(RepoName),
    /// A job failed; surface it to the user if nobody is watching.
    Notify {
        repo: RepoName,
        path: PathBuf,
        summary: String,
    },
    JobFinished(JobReport),
}

#[derive(Debug, Default)]
pub struct Orchestrator {
    client_name: String,
    /// Configuration order.
    repos: Vec<RepositoryRuntime>,
    queue: VecDeque<SyncJob>,
    next_job: u64,
    draining: bool,
    directives: Vec<Directive>,
}

impl Orchestrator {
    pub fn new(settings: &Settings) -> Self {
        Self {
            client_name: settings.effective_client_name(),
            repos: settings
                .repos
                .iter()
                .cloned()
                .map(RepositoryRuntime::new)
                .collect(),
            ..Self::default()
        }
    }

    /// Enqueue every configured repository once. Call at startup.
    pub fn start(&mut self) -> Vec<RepoName> {
        tracing::info!("starting with {} repositories", self.repos.len());
        self.enqueue_all()
    }

    pub fn take_directives(&mut self) -> Vec<Directive> {
        std::mem::take(&mut self.directives)
    }

    // -----------------------------------------------------------------------
    // Queue
    // -----------------------------------------------------------------------

    /// Append a job for `name` unless one is already queued or running.
    ///
    /// Returns `true` if a job was created.
    pub fn enqueue(&mut self, name: &RepoName) -> bool {
        let Some(index) = self.index_of(name) else {
            tracing::warn!("[{name}] enqueue for unknown repository ignored");
            return false;
        };
        if self.queue.iter().any(|job| !job.detached && &job.repo == name) {
            tracing::debug!("[{name}] already queued");
            return false;
        }

        self.next_job += 1;
        self.queue
            .push_back(SyncJob::new(JobId(self.next_job), name.clone()));
        self.repos[index].refreshing = true;
        tracing::debug!("[{name}] enqueued at position {}", self.queue.len());
        self.publish(index);

        if !self.draining {
            self.draining = true;
            self.directives.push(Directive::ScheduleTurn);
        }
        true
    }

    /// Enqueue every repository in configuration order; returns the ones that
    /// got a new job.
    pub fn enqueue_all(&mut self) -> Vec<RepoName> {
        let names: Vec<RepoName> = self.repos.iter().map(|rt| rt.name().clone()).collect();
        names.into_iter().filter(|name| self.enqueue(name)).collect()
    }

    /// Advance the front job by one step.
    pub fn turn(&mut self) {
        let Some(job) = self.queue.front_mut() else {
            self.draining = false;
            return;
        };
        if job.is_waiting() {
            tracing::debug!("[{}] turn skipped, command in flight", job.repo);
            return;
        }
        if job.detached {
            tracing::info!("[{}] repository removed, dropping job {}", job.repo, job.id);
            self.queue.pop_front();
            self.continue_draining();
            return;
        }
        let Some(rt) = self.repos.iter_mut().find(|rt| rt.config.name == job.repo) else {
            tracing::info!("[{}] repository removed, dropping its job", job.repo);
            self.queue.pop_front();
            self.continue_draining();
            return;
        };

        let timer_stopped = job.state == JobState::Init && job.steps == 0 && rt.stop_timer();
        let repo = job.repo.clone();
        let transition = machine::begin_step(job, rt);

        if timer_stopped {
            self.directives.push(Directive::CancelTimer { repo });
        }
        self.apply(transition);
    }

    /// Deliver the result of the [`Directive::Execute`] issued for job `id`.
    pub fn command_finished(&mut self, id: JobId, result: CommandResult) {
        let Some(job) = self.queue.front_mut() else {
            tracing::warn!("command result for job {id} with empty queue dropped");
            return;
        };
        if job.id != id || !job.is_waiting() {
            tracing::warn!(
                "[{}] command result for job {id} does not match running job {}, dropped",
                job.repo,
                job.id
            );
            return;
        }
        let found = if job.detached {
            None
        } else {
            self.repos.iter_mut().find(|rt| rt.config.name == job.repo)
        };
        let Some(rt) = found else {
            tracing::info!("[{}] repository removed mid-command, dropping job {id}", job.repo);
            self.queue.pop_front();
            self.continue_draining();
            return;
        };

        let ctx = StepContext {
            client_name: &self.client_name,
        };
        let transition = machine::resume_step(job, rt, &ctx, result);
        self.apply(transition);
    }

    fn apply(&mut self, transition: Transition) {
        match transition {
            Transition::Execute(op) => {
                let Some(job) = self.queue.front_mut() else {
                    return;
                };
                job.commands += 1;
                let id = job.id;
                let repo = job.repo.clone();
                let Some(index) = self.index_of(&repo) else {
                    return;
                };
                tracing::debug!("[{repo}] job {id} requesting `{op}`");
                let workdir = self.repos[index].config.path.clone();
                self.directives.push(Directive::Execute {
                    job: id,
                    repo,
                    workdir,
                    op,
                });
            }
            Transition::Next => {
                let front = self.queue.front().and_then(|job| self.index_of(&job.repo));
                if let Some(index) = front {
                    self.publish(index);
                }
                self.directives.push(Directive::ScheduleTurn);
            }
            Transition::Finished(outcome) => self.finish_front(outcome),
        }
    }

    fn finish_front(&mut self, outcome: Outcome) {
        let Some(job) = self.queue.pop_front() else {
            return;
        };

        if let Some(index) = self.index_of(&job.repo) {
            let rt = &mut self.repos[index];
            rt.refreshing = false;
            rt.ok = outcome == Outcome::Success;

            let report = JobReport {
                repo: job.repo.clone(),
                outcome,
                final_state: job.state,
                steps: job.steps,
                commands: job.commands,
                failure_kind: job.failure,
                summary: rt.summary.clone(),
            };
            tracing::info!(
                "[{}] sync finished: outcome={:?} state={} steps={} commands={}",
                job.repo,
                outcome,
                job.state,
                job.steps,
                job.commands
            );

            match outcome {
                Outcome::Success => self.arm_timer(index),
                Outcome::Failure => {
                    let rt = &self.repos[index];
                    self.directives.push(Directive::Notify {
                        repo: rt.name().clone(),
                        path: rt.config.path.clone(),
                        summary: rt.summary.clone(),
                    });
                }
            }
            self.publish(index);
            self.directives.push(Directive::JobFinished(report));
        }

        self.continue_draining();
    }

    fn continue_draining(&mut self) {
        if self.queue.is_empty() {
            self.draining = false;
        } else {
            self.directives.push(Directive::ScheduleTurn);
        }
    }

    // -----------------------------------------------------------------------
    // Timers
    // -----------------------------------------------------------------------

    /// A timer armed with `generation` expired.
    pub fn timer_fired(&mut self, repo: &RepoName, generation: u64) {
        let Some(index) = self.index_of(repo) else {
            return;
        };
        let timer = &mut self.repos[index].timer;
        if timer.generation != generation || !timer.is_armed() {
            tracing::debug!("[{repo}] stale timer generation {generation} ignored");
            return;
        }
        timer.due_at = None;
        tracing::debug!("[{repo}] auto-refresh timer fired");
        self.enqueue(repo);
    }

    /// Stop auto-refresh. A queued or running job is left alone.
    ///
    /// Returns `false` for an unknown repository.
    pub fn pause(&mut self, repo: &RepoName) -> bool {
        let Some(index) = self.index_of(repo) else {
            return false;
        };
        self.stop_timer(index);
        self.publish(index);
        true
    }

    fn arm_timer(&mut self, index: usize) {
        let rt = &mut self.repos[index];
        if let Some((generation, after)) = rt.arm_timer() {
            self.directives.push(Directive::ArmTimer {
                repo: rt.name().clone(),
                generation,
                after,
            });
        }
    }

    fn stop_timer(&mut self, index: usize) {
        let rt = &mut self.repos[index];
        if rt.stop_timer() {
            self.directives.push(Directive::CancelTimer {
                repo: rt.name().clone(),
            });
        }
    }

    // -----------------------------------------------------------------------
    // Configuration changes
    // -----------------------------------------------------------------------

    /// Reconcile runtime state with a freshly loaded configuration.
    ///
    /// A repository whose name disappeared while a new name appeared with the
    /// same path is treated as a rename.
    pub fn apply_settings(&mut self, settings: &Settings) {
        let client_name = settings.effective_client_name();
        if client_name != self.client_name {
            tracing::info!("client name changed to {client_name}");
            self.client_name = client_name;
        }

        let wanted: HashSet<&RepoName> = settings.repos.iter().map(|r| &r.name).collect();
        let existing: HashSet<RepoName> =
            self.repos.iter().map(|rt| rt.name().clone()).collect();
        let mut added: Vec<&RepositoryConfig> = settings
            .repos
            .iter()
            .filter(|r| !existing.contains(&r.name))
            .collect();

        let gone: Vec<RepoName> = existing
            .iter()
            .filter(|name| !wanted.contains(name))
            .cloned()
            .collect();
        for name in gone {
            let Some(index) = self.index_of(&name) else {
                continue;
            };
            let path = self.repos[index].config.path.clone();
            if let Some(pos) = added.iter().position(|r| r.path == path) {
                let config = added.remove(pos);
                self.rename(index, config.name.clone());
            } else {
                self.remove(index);
            }
        }

        for config in &settings.repos {
            if let Some(index) = self.index_of(&config.name) {
                self.update(index, config);
            }
        }

        let mut fresh = Vec::new();
        for config in added {
            tracing::info!("[{}] repository added", config.name);
            self.repos.push(RepositoryRuntime::new(config.clone()));
            fresh.push(config.name.clone());
        }

        let order: Vec<&RepoName> = settings.repos.iter().map(|r| &r.name).collect();
        self.repos
            .sort_by_key(|rt| order.iter().position(|name| *name == rt.name()));

        for name in fresh {
            self.enqueue(&name);
        }
    }

    fn rename(&mut self, index: usize, new_name: RepoName) {
        let old_name = self.repos[index].name().clone();
        tracing::info!("[{old_name}] renamed to {new_name}");

        let was_armed = self.repos[index].timer.is_armed();
        self.stop_timer(index);
        self.repos[index].config.name = new_name.clone();
        for job in self
            .queue
            .iter_mut()
            .filter(|job| !job.detached && job.repo == old_name)
        {
            job.repo = new_name.clone();
        }
        if was_armed {
            self.arm_timer(index);
        }
        self.directives.push(Directive::Removed(old_name));
        self.publish(index);
    }

    fn remove(&mut self, index: usize) {
        let name = self.repos[index].name().clone();
        tracing::info!("[{name}] repository removed");
        self.stop_timer(index);

        // The front job may have a command in flight. It stays, detached
        // from any runtime, until its next turn or result drops it.
        if let Some(job) = self.queue.front_mut() {
            if job.repo == name {
                job.detached = true;
            }
        }
        self.queue.retain(|job| job.detached || job.repo != name);

        self.repos.remove(index);
        self.directives.push(Directive::Removed(name));
    }

    fn update(&mut self, index: usize, config: &RepositoryConfig) {
        let rt = &mut self.repos[index];
        if rt.config == *config {
            return;
        }
        let old_interval = rt.config.refresh_interval_minutes;
        let new_interval = config.refresh_interval_minutes;
        rt.config = config.clone();

        if new_interval != old_interval {
            tracing::info!(
                "[{}] refresh interval {old_interval} -> {new_interval} mins",
                config.name
            );
            let armed = rt.timer.is_armed();
            let idle = !rt.refreshing;
            if new_interval == 0 {
                self.stop_timer(index);
            } else if armed || (old_interval == 0 && idle) {
                self.arm_timer(index);
            }
        }
        self.publish(index);
    }

    // -----------------------------------------------------------------------
    // Views
    // -----------------------------------------------------------------------

    pub fn client_name(&self) -> &str {
        &self.client_name
    }

    pub fn repo_names(&self) -> Vec<RepoName> {
        self.repos.iter().map(|rt| rt.name().clone()).collect()
    }

    pub fn runtime(&self, name: &RepoName) -> Option<&RepositoryRuntime> {
        self.repos.iter().find(|rt| rt.name() == name)
    }

    pub fn snapshot(&self, name: &RepoName) -> Option<RepoSnapshot> {
        self.runtime(name)
            .map(|rt| RepoSnapshot::capture(rt, Local::now()))
    }

    pub fn snapshots(&self) -> Vec<RepoSnapshot> {
        let now = Local::now();
        self.repos
            .iter()
            .map(|rt| RepoSnapshot::capture(rt, now))
            .collect()
    }

    pub fn overall_status(&self) -> OverallStatus {
        OverallStatus::of(&self.snapshots())
    }

    /// Repositories with a job, front first.
    pub fn queued(&self) -> Vec<RepoName> {
        self.queue
            .iter()
            .filter(|job| !job.detached)
            .map(|job| job.repo.clone())
            .collect()
    }

    pub fn is_idle(&self) -> bool {
        self.queue.is_empty()
    }

    fn index_of(&self, name: &RepoName) -> Option<usize> {
        self.repos.iter().position(|rt| rt.name() == name)
    }

    fn publish(&mut self, index: usize) {
        let snapshot = RepoSnapshot::capture(&self.repos[index], Local::now());
        self.directives.push(Directive::StateChanged(snapshot));
    }
}
