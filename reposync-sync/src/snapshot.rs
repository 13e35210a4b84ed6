//! Read-only views of repository state for presentation.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use reposync_core::RepoName;

use crate::runtime::RepositoryRuntime;

/// Per-repository status shown next to its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepoStatus {
    Refreshing,
    Error,
    Ok,
    Paused,
}

impl RepoStatus {
    /// Refreshing wins over Error, Error over a running timer.
    pub fn of(rt: &RepositoryRuntime) -> Self {
        if rt.refreshing {
            RepoStatus::Refreshing
        } else if !rt.ok {
            RepoStatus::Error
        } else if rt.timer.is_armed() {
            RepoStatus::Ok
        } else {
            RepoStatus::Paused
        }
    }
}

impl fmt::Display for RepoStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RepoStatus::Refreshing => "Refreshing",
            RepoStatus::Error => "Error",
            RepoStatus::Ok => "OK",
            RepoStatus::Paused => "Paused",
        })
    }
}

/// Aggregate indicator across all repositories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverallStatus {
    Refreshing,
    Error,
    Ok,
}

impl OverallStatus {
    pub fn of<'a>(repos: impl IntoIterator<Item = &'a RepoSnapshot>) -> Self {
        let mut any_error = false;
        for repo in repos {
            if repo.refreshing {
                return OverallStatus::Refreshing;
            }
            any_error |= !repo.ok;
        }
        if any_error {
            OverallStatus::Error
        } else {
            OverallStatus::Ok
        }
    }
}

impl fmt::Display for OverallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OverallStatus::Refreshing => "Refreshing",
            OverallStatus::Error => "Error",
            OverallStatus::Ok => "OK",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoSnapshot {
    pub name: RepoName,
    pub path: PathBuf,
    pub status: RepoStatus,
    pub ok: bool,
    pub refreshing: bool,
    pub summary: String,
    pub branch: Option<String>,
    pub remote: Option<String>,
    pub remote_url: Option<String>,
    pub refresh_interval_minutes: u32,
    pub next_refresh_at: Option<DateTime<Local>>,
    /// Human text describing the auto-refresh schedule.
    pub schedule: String,
    pub log: Vec<String>,
}

impl RepoSnapshot {
    pub fn capture(rt: &RepositoryRuntime, now: DateTime<Local>) -> Self {
        Self {
            name: rt.config.name.clone(),
            path: rt.config.path.clone(),
            status: RepoStatus::of(rt),
            ok: rt.ok,
            refreshing: rt.refreshing,
            summary: rt.summary.clone(),
            branch: rt.branch.clone(),
            remote: rt.remote.clone(),
            remote_url: rt.remote_url.clone(),
            refresh_interval_minutes: rt.config.refresh_interval_minutes,
            next_refresh_at: rt.timer.due_at,
            schedule: schedule_text(
                rt.config.refresh_interval_minutes,
                rt.refreshing,
                rt.timer.remaining(now),
            ),
            log: rt.log.clone(),
        }
    }

    /// `Status: <status>` plus the summary when there is one.
    pub fn status_line(&self) -> String {
        let summary = self.summary.trim();
        if summary.is_empty() {
            format!("Status: {}", self.status)
        } else {
            format!("Status: {}: {summary}", self.status)
        }
    }

    /// `branch @ remote`, with `?` for anything not detected yet.
    pub fn branch_remote(&self) -> String {
        format!(
            "{} @ {}",
            self.branch.as_deref().unwrap_or("?"),
            self.remote.as_deref().unwrap_or("?")
        )
    }
}

/// Describe the auto-refresh schedule.
///
/// `remaining` is `None` when no timer is armed.
pub fn schedule_text(interval_minutes: u32, refreshing: bool, remaining: Option<Duration>) -> String {
    if interval_minutes == 0 {
        return "Auto-refresh disabled".to_string();
    }

    let state = if refreshing {
        "Refreshing".to_string()
    } else if let Some(remaining) = remaining {
        let secs = remaining.as_secs();
        if secs < 60 {
            format!("Next refresh: {secs} secs")
        } else {
            format!("Next refresh: {} mins", secs / 60)
        }
    } else {
        "Auto-refresh paused".to_string()
    };
    format!("{state} (Rate: every {interval_minutes} mins)")
}
