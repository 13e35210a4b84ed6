//! Mutable per-repository state, owned by the orchestrator.

use std::time::Duration;

use chrono::{DateTime, Local};

use reposync_core::{RepoName, RepositoryConfig};

use crate::error::JobFailure;

const LOG_TIMESTAMP: &str = "%Y-%m-%d %H:%M:%S";

/// Auto-refresh timer bookkeeping.
///
/// The timer itself lives with whoever executes the `ArmTimer` directive;
/// this only records whether it should be running. Every arm or stop bumps
/// `generation`, so an expiry carrying an older generation is stale.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimerState {
    pub generation: u64,
    pub due_at: Option<DateTime<Local>>,
}

impl TimerState {
    pub fn is_armed(&self) -> bool {
        self.due_at.is_some()
    }

    pub fn remaining(&self, now: DateTime<Local>) -> Option<Duration> {
        let due_at = self.due_at?;
        Some((due_at - now).to_std().unwrap_or(Duration::ZERO))
    }
}

#[derive(Debug, Clone)]
pub struct RepositoryRuntime {
    pub config: RepositoryConfig,
    /// Outcome of the last finished job. `true` until a job fails.
    pub ok: bool,
    /// A job for this repository is queued or running.
    pub refreshing: bool,
    pub summary: String,
    /// Cleared when a job starts.
    pub log: Vec<String>,
    pub branch: Option<String>,
    pub remote: Option<String>,
    pub remote_url: Option<String>,
    pub timer: TimerState,
}

impl RepositoryRuntime {
    pub fn new(config: RepositoryConfig) -> Self {
        Self {
            config,
            ok: true,
            refreshing: false,
            summary: String::new(),
            log: Vec::new(),
            branch: None,
            remote: None,
            remote_url: None,
            timer: TimerState::default(),
        }
    }

    pub fn name(&self) -> &RepoName {
        &self.config.name
    }

    /// Append a timestamped line.
    pub fn log(&mut self, line: impl AsRef<str>) {
        let stamp = Local::now().format(LOG_TIMESTAMP);
        self.log.push(format!("[{stamp}] {}", line.as_ref()));
    }

    /// Record a failure: summary line, then the raw command report and any
    /// remediation guidance.
    pub fn log_failure(&mut self, failure: &JobFailure) {
        let summary = failure.to_string();
        self.log(&summary);
        if let Some(detail) = failure.detail() {
            self.log.push(detail);
        }
        if let Some(guidance) = failure.guidance() {
            self.log(guidance);
        }
        self.summary = summary;
        self.ok = false;
    }

    /// Start-of-job reset.
    pub fn reset_log(&mut self) {
        self.log.clear();
        self.summary.clear();
    }

    /// Bump the generation and record a new due time. Returns the interval to
    /// arm with, or `None` if auto-refresh is disabled.
    pub(crate) fn arm_timer(&mut self) -> Option<(u64, Duration)> {
        let after = self.config.refresh_interval()?;
        self.timer.generation += 1;
        self.timer.due_at = chrono::Duration::from_std(after)
            .ok()
            .map(|after| Local::now() + after);
        Some((self.timer.generation, after))
    }

    /// Returns `true` if the timer was armed.
    pub(crate) fn stop_timer(&mut self) -> bool {
        if !self.timer.is_armed() {
            return false;
        }
        self.timer.generation += 1;
        self.timer.due_at = None;
        true
    }
}
