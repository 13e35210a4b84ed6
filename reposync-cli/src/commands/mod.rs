pub mod client_name;
pub mod daemon;
pub mod log;
pub mod pause;
pub mod repo;
pub mod status;
pub mod sync;
pub mod watch;

use std::path::PathBuf;

use anyhow::{Context, Result};

pub(crate) fn home() -> Result<PathBuf> {
    dirs::home_dir().context("could not determine home directory")
}

/// Hint appended to errors when the daemon socket is missing.
pub(crate) const START_DAEMON_HINT: &str = "start it with `reposync daemon start`";
