//! `reposync pause <REPO>`

use anyhow::{Context, Result};
use clap::Args;

use reposync_daemon::{request_pause, DaemonError};

use super::{home, START_DAEMON_HINT};

#[derive(Args, Debug)]
pub struct PauseArgs {
    /// Repository whose auto-refresh timer should stop.
    pub repo: String,
}

impl PauseArgs {
    pub fn run(self) -> Result<()> {
        match request_pause(&home()?, self.repo.clone()) {
            Ok(()) => {
                println!("✓ Auto-refresh paused for '{}'", self.repo);
                Ok(())
            }
            Err(err @ DaemonError::DaemonNotRunning { .. }) => {
                Err(err).context(START_DAEMON_HINT)
            }
            Err(err) => Err(err).with_context(|| format!("failed to pause '{}'", self.repo)),
        }
    }
}
