use std::path::{Path, PathBuf};
use std::time::Duration;

use reposync_core::settings;

/// Quiet period after the last settings-file event before it is reloaded.
pub const DEBOUNCE_WINDOW: Duration = Duration::from_millis(500);

pub const DAEMON_SOCKET: &str = "daemon.sock";

pub fn reposync_root(home: &Path) -> PathBuf {
    settings::config_dir_at(home)
}

pub fn socket_path(home: &Path) -> PathBuf {
    reposync_root(home).join(DAEMON_SOCKET)
}
