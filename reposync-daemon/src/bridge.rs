//! Worker side of the control/worker bridge.
//!
//! One dedicated OS thread owns the [`CommandExecutor`] and runs requests in
//! submission order, one at a time. Each result goes back to the control loop
//! as a [`ControlEvent::CommandFinished`]; the worker never touches
//! orchestrator state.

use std::path::PathBuf;
use std::thread::JoinHandle;

use tokio::sync::mpsc;

use reposync_core::RepoName;
use reposync_git::{CommandExecutor, CommandResult, GitOp};
use reposync_sync::JobId;

use crate::control::ControlEvent;
use crate::error::{io_err, DaemonError};

pub const WORKER_THREAD_NAME: &str = "reposync-worker";

#[derive(Debug, Clone)]
pub struct WorkRequest {
    pub job: JobId,
    pub repo: RepoName,
    pub workdir: PathBuf,
    pub op: GitOp,
}

pub struct Worker {
    tx: Option<mpsc::UnboundedSender<WorkRequest>>,
    thread: Option<JoinHandle<()>>,
}

impl Worker {
    pub fn spawn(
        executor: Box<dyn CommandExecutor>,
        events: mpsc::UnboundedSender<ControlEvent>,
    ) -> Result<Self, DaemonError> {
        let (tx, mut rx) = mpsc::unbounded_channel::<WorkRequest>();

        let thread = std::thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(move || {
                while let Some(request) = rx.blocking_recv() {
                    let result = executor.execute(&request.workdir, &request.op);
                    let event = ControlEvent::CommandFinished {
                        job: request.job,
                        repo: request.repo,
                        result,
                    };
                    if events.send(event).is_err() {
                        break;
                    }
                }
            })
            .map_err(|e| io_err(WORKER_THREAD_NAME, e))?;

        Ok(Self {
            tx: Some(tx),
            thread: Some(thread),
        })
    }

    /// Queue a command. When the worker is gone the request comes back as a
    /// [`ControlEvent::CommandFinished`] carrying a crashed result, so the
    /// waiting job can fail instead of hang.
    pub fn submit(&self, request: WorkRequest) -> Result<(), ControlEvent> {
        let Some(tx) = &self.tx else {
            return Err(Self::rejected(request));
        };
        tx.send(request).map_err(|err| Self::rejected(err.0))
    }

    fn rejected(request: WorkRequest) -> ControlEvent {
        let result = CommandResult::crashed(
            format!("git {}", request.op),
            "command worker is not running",
        );
        ControlEvent::CommandFinished {
            job: request.job,
            repo: request.repo,
            result,
        }
    }

    /// Close the request channel and wait for the in-flight command, if any.
    pub fn join(mut self) {
        self.tx.take();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                tracing::error!("command worker panicked");
            }
        }
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        // Detach: closing the channel lets the thread exit after its current
        // command.
        self.tx.take();
    }
}
