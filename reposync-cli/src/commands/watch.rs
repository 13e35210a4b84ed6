//! `reposync watch`: follow the daemon's event stream.

use anyhow::{Context, Result};
use colored::Colorize;

use reposync_daemon::{subscribe, DaemonError, RepoEvent};
use reposync_sync::Outcome;

use super::{home, status::paint_status, START_DAEMON_HINT};

pub fn run() -> Result<()> {
    let result = subscribe(&home()?, |event| {
        println!("{}", render(&event));
        true
    });
    match result {
        Ok(()) => {
            println!("daemon closed the connection");
            Ok(())
        }
        Err(err @ DaemonError::DaemonNotRunning { .. }) => Err(err).context(START_DAEMON_HINT),
        Err(err) => Err(err).context("event stream failed"),
    }
}

fn render(event: &RepoEvent) -> String {
    match event {
        RepoEvent::StateChanged { snapshot } => format!(
            "[{}] {} | {} | {}",
            snapshot.name,
            paint_status(snapshot.status),
            snapshot.branch_remote(),
            snapshot.schedule
        ),
        RepoEvent::Removed { repo } => format!("[{repo}] removed"),
        RepoEvent::JobFinished { report } => match report.outcome {
            Outcome::Success => format!("[{}] {}", report.repo, "sync finished".green()),
            Outcome::Failure => format!(
                "[{}] {}: {}",
                report.repo,
                "sync failed".red().bold(),
                report.summary
            ),
        },
    }
}
