//! Control side of the bridge: the single task that owns the [`Orchestrator`].
//!
//! Everything that mutates orchestrator state arrives here as a
//! [`ControlEvent`] and is handled to completion before the next one, so no
//! locks are needed. Queue continuations are posted back onto the same event
//! channel as [`ControlEvent::Turn`], one step per event.

use std::collections::HashMap;

use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::AbortHandle;

use reposync_core::{RepoName, Settings};
use reposync_git::{CommandExecutor, CommandResult};
use reposync_sync::{Directive, JobId, JobReport, Orchestrator};

use crate::bridge::{WorkRequest, Worker};
use crate::error::DaemonError;
use crate::hub::EventHub;
use crate::protocol::{RepoEvent, StatusPayload};

#[derive(Debug)]
pub enum ControlEvent {
    /// Advance the front job by one step.
    Turn,
    CommandFinished {
        job: JobId,
        repo: RepoName,
        result: CommandResult,
    },
    TimerFired {
        repo: RepoName,
        generation: u64,
    },
    /// Manual refresh of one repository, or of all when `repo` is `None`.
    Sync {
        repo: Option<RepoName>,
        reply: oneshot::Sender<Result<Vec<RepoName>, DaemonError>>,
    },
    Pause {
        repo: RepoName,
        reply: oneshot::Sender<Result<(), DaemonError>>,
    },
    Status {
        reply: oneshot::Sender<StatusPayload>,
    },
    SettingsChanged(Settings),
}

/// Cloneable sender side used by the socket server and the settings watcher.
#[derive(Debug, Clone)]
pub struct ControlHandle {
    tx: mpsc::UnboundedSender<ControlEvent>,
}

impl ControlHandle {
    pub async fn sync(&self, repo: Option<RepoName>) -> Result<Vec<RepoName>, DaemonError> {
        let (reply, rx) = oneshot::channel();
        self.send(ControlEvent::Sync { repo, reply })?;
        rx.await
            .map_err(|_| DaemonError::ChannelClosed("sync reply"))?
    }

    pub async fn pause(&self, repo: RepoName) -> Result<(), DaemonError> {
        let (reply, rx) = oneshot::channel();
        self.send(ControlEvent::Pause { repo, reply })?;
        rx.await
            .map_err(|_| DaemonError::ChannelClosed("pause reply"))?
    }

    pub async fn status(&self) -> Result<StatusPayload, DaemonError> {
        let (reply, rx) = oneshot::channel();
        self.send(ControlEvent::Status { reply })?;
        rx.await
            .map_err(|_| DaemonError::ChannelClosed("status reply"))
    }

    pub fn settings_changed(&self, settings: Settings) -> Result<(), DaemonError> {
        self.send(ControlEvent::SettingsChanged(settings))
    }

    fn send(&self, event: ControlEvent) -> Result<(), DaemonError> {
        self.tx
            .send(event)
            .map_err(|_| DaemonError::ChannelClosed("control events"))
    }
}

pub struct ControlLoop {
    orchestrator: Orchestrator,
    events_tx: mpsc::UnboundedSender<ControlEvent>,
    events_rx: mpsc::UnboundedReceiver<ControlEvent>,
    worker: Worker,
    timers: HashMap<RepoName, AbortHandle>,
    timers_enabled: bool,
    hub: EventHub,
    reports: Vec<JobReport>,
}

impl ControlLoop {
    pub fn new(
        settings: &Settings,
        executor: Box<dyn CommandExecutor>,
        hub: EventHub,
    ) -> Result<Self, DaemonError> {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let worker = Worker::spawn(executor, events_tx.clone())?;
        Ok(Self {
            orchestrator: Orchestrator::new(settings),
            events_tx,
            events_rx,
            worker,
            timers: HashMap::new(),
            timers_enabled: true,
            hub,
            reports: Vec::new(),
        })
    }

    /// Do not arm refresh timers. Used by one-shot runs.
    pub fn without_timers(mut self) -> Self {
        self.timers_enabled = false;
        self
    }

    pub fn handle(&self) -> ControlHandle {
        ControlHandle {
            tx: self.events_tx.clone(),
        }
    }

    /// Enqueue every configured repository once.
    pub fn start(&mut self) -> Vec<RepoName> {
        let enqueued = self.orchestrator.start();
        self.dispatch();
        enqueued
    }

    pub fn enqueue(&mut self, repo: Option<&RepoName>) -> Result<Vec<RepoName>, DaemonError> {
        let enqueued = match repo {
            Some(name) => {
                if self.orchestrator.runtime(name).is_none() {
                    return Err(DaemonError::UnknownRepo(name.to_string()));
                }
                if self.orchestrator.enqueue(name) {
                    vec![name.clone()]
                } else {
                    Vec::new()
                }
            }
            None => self.orchestrator.enqueue_all(),
        };
        self.dispatch();
        Ok(enqueued)
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    /// Handle events until `shutdown_rx` fires.
    pub async fn run(mut self, mut shutdown_rx: broadcast::Receiver<()>) -> Result<(), DaemonError> {
        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => break,
                event = self.events_rx.recv() => {
                    let Some(event) = event else { break };
                    self.handle_event(event);
                }
            }
        }
        self.shutdown().await;
        Ok(())
    }

    /// Handle events until the queue is empty; returns the reports of every
    /// job that finished meanwhile.
    pub async fn run_until_idle(mut self) -> Result<Vec<JobReport>, DaemonError> {
        while !self.orchestrator.is_idle() {
            let Some(event) = self.events_rx.recv().await else {
                return Err(DaemonError::ChannelClosed("control events"));
            };
            self.handle_event(event);
        }
        let reports = std::mem::take(&mut self.reports);
        self.shutdown().await;
        Ok(reports)
    }

    fn handle_event(&mut self, event: ControlEvent) {
        match event {
            ControlEvent::Turn => self.orchestrator.turn(),
            ControlEvent::CommandFinished { job, repo, result } => {
                tracing::debug!(
                    repo = %repo,
                    job = %job,
                    command = %result.command,
                    exit_code = ?result.exit_code,
                    "command finished"
                );
                self.orchestrator.command_finished(job, result);
            }
            ControlEvent::TimerFired { repo, generation } => {
                self.timers.remove(&repo);
                self.orchestrator.timer_fired(&repo, generation);
            }
            ControlEvent::Sync { repo, reply } => {
                let result = self.enqueue(repo.as_ref());
                let _ = reply.send(result);
            }
            ControlEvent::Pause { repo, reply } => {
                let result = if self.orchestrator.pause(&repo) {
                    tracing::info!(repo = %repo, "auto-refresh paused");
                    Ok(())
                } else {
                    Err(DaemonError::UnknownRepo(repo.to_string()))
                };
                let _ = reply.send(result);
            }
            ControlEvent::Status { reply } => {
                let _ = reply.send(self.status_payload());
            }
            ControlEvent::SettingsChanged(settings) => {
                tracing::info!(repos = settings.repos.len(), "settings reloaded");
                self.orchestrator.apply_settings(&settings);
            }
        }
        self.dispatch();
    }

    fn status_payload(&self) -> StatusPayload {
        StatusPayload {
            overall: self.orchestrator.overall_status(),
            client_name: self.orchestrator.client_name().to_string(),
            queued: self.orchestrator.queued(),
            repos: self.orchestrator.snapshots(),
        }
    }

    fn dispatch(&mut self) {
        for directive in self.orchestrator.take_directives() {
            match directive {
                Directive::ScheduleTurn => {
                    let _ = self.events_tx.send(ControlEvent::Turn);
                }
                Directive::Execute {
                    job,
                    repo,
                    workdir,
                    op,
                } => {
                    let request = WorkRequest {
                        job,
                        repo,
                        workdir,
                        op,
                    };
                    if let Err(crashed) = self.worker.submit(request) {
                        tracing::error!(job = %job, "command worker unavailable");
                        let _ = self.events_tx.send(crashed);
                    }
                }
                Directive::ArmTimer {
                    repo,
                    generation,
                    after,
                } => self.arm_timer(repo, generation, after),
                Directive::CancelTimer { repo } => self.cancel_timer(&repo),
                Directive::StateChanged(snapshot) => {
                    self.hub.publish(RepoEvent::StateChanged { snapshot });
                }
                Directive::Removed(repo) => {
                    self.cancel_timer(&repo);
                    self.hub.publish(RepoEvent::Removed { repo });
                }
                Directive::Notify {
                    repo,
                    path,
                    summary,
                } => {
                    self.hub.notify(&repo, &path, &summary);
                }
                Directive::JobFinished(report) => {
                    tracing::info!(
                        repo = %report.repo,
                        outcome = ?report.outcome,
                        state = %report.final_state,
                        "job finished"
                    );
                    self.hub.publish(RepoEvent::JobFinished {
                        report: report.clone(),
                    });
                    self.reports.push(report);
                }
            }
        }
    }

    fn arm_timer(&mut self, repo: RepoName, generation: u64, after: std::time::Duration) {
        self.cancel_timer(&repo);
        if !self.timers_enabled {
            return;
        }
        let tx = self.events_tx.clone();
        let fired = repo.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(after).await;
            let _ = tx.send(ControlEvent::TimerFired {
                repo: fired,
                generation,
            });
        });
        self.timers.insert(repo, task.abort_handle());
    }

    fn cancel_timer(&mut self, repo: &RepoName) {
        if let Some(timer) = self.timers.remove(repo) {
            timer.abort();
        }
    }

    async fn shutdown(self) {
        for (_, timer) in self.timers {
            timer.abort();
        }
        let worker = self.worker;
        if tokio::task::spawn_blocking(move || worker.join()).await.is_err() {
            tracing::error!("command worker join failed");
        }
    }
}
