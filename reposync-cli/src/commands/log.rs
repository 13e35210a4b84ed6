//! `reposync log <REPO>`

use anyhow::{Context, Result};
use clap::Args;

use reposync_daemon::{request_status, DaemonError};

use super::{home, START_DAEMON_HINT};

#[derive(Args, Debug)]
pub struct LogArgs {
    /// Repository whose status log to print.
    pub repo: String,
}

impl LogArgs {
    pub fn run(self) -> Result<()> {
        let status = match request_status(&home()?) {
            Ok(status) => status,
            Err(err @ DaemonError::DaemonNotRunning { .. }) => {
                return Err(err).context(START_DAEMON_HINT)
            }
            Err(err) => return Err(err).context("failed to query daemon status"),
        };

        let snapshot = status
            .repos
            .iter()
            .find(|repo| repo.name.as_str() == self.repo)
            .with_context(|| format!("no repository named '{}' is configured", self.repo))?;

        println!("{}", snapshot.status_line());
        for line in &snapshot.log {
            println!("{line}");
        }
        Ok(())
    }
}
