//! The blocking command boundary.
//!
//! [`CommandExecutor::execute`] blocks until the child exits. Callers must run
//! it off any latency-sensitive thread; the daemon only ever calls it from its
//! dedicated worker thread.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use reposync_core::Settings;

use crate::ops::GitOp;

// ---------------------------------------------------------------------------
// CommandResult
// ---------------------------------------------------------------------------

/// Captured outcome of one external command. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    /// Rendered command line, for diagnostics only.
    pub command: String,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    /// `None` when the process crashed or could not be started.
    pub exit_code: Option<i32>,
    /// `true` on crash or non-zero exit.
    pub has_error: bool,
}

impl CommandResult {
    /// Result of a process that ran to completion.
    pub fn exited(
        command: impl Into<String>,
        exit_code: i32,
        stdout: impl Into<Vec<u8>>,
        stderr: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            command: command.into(),
            stdout: stdout.into(),
            stderr: stderr.into(),
            exit_code: Some(exit_code),
            has_error: exit_code != 0,
        }
    }

    /// Result of a process that crashed or never started.
    pub fn crashed(command: impl Into<String>, stderr: impl Into<Vec<u8>>) -> Self {
        Self {
            command: command.into(),
            stdout: Vec::new(),
            stderr: stderr.into(),
            exit_code: None,
            has_error: true,
        }
    }

    pub fn stdout_text(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub fn stderr_text(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }

    /// Multi-line diagnostic block appended to a repository's status log.
    pub fn report(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for CommandResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Command: {}", self.command)?;
        writeln!(
            f,
            "Exitcode: {} - {}",
            self.exit_code.unwrap_or(-1),
            if self.has_error { "Error" } else { "Success" }
        )?;
        writeln!(f, "Stdout:")?;
        writeln!(f, "{}", self.stdout_text().trim_end())?;
        writeln!(f, "Stderr:")?;
        write!(f, "{}", self.stderr_text().trim_end())
    }
}

// ---------------------------------------------------------------------------
// Executor trait
// ---------------------------------------------------------------------------

/// Runs one git operation in a working directory and waits for it.
///
/// No retry and no timeout. Failures are reported inside the returned
/// [`CommandResult`], never as a panic or `Err`.
pub trait CommandExecutor: Send {
    fn execute(&self, workdir: &Path, op: &GitOp) -> CommandResult;
}

impl<E: CommandExecutor + Sync + ?Sized> CommandExecutor for &E {
    fn execute(&self, workdir: &Path, op: &GitOp) -> CommandResult {
        (**self).execute(workdir, op)
    }
}

impl<E: CommandExecutor + ?Sized> CommandExecutor for Box<E> {
    fn execute(&self, workdir: &Path, op: &GitOp) -> CommandResult {
        (**self).execute(workdir, op)
    }
}

/// Platform default git binary.
pub fn default_git_command() -> PathBuf {
    if cfg!(windows) {
        PathBuf::from("C:/Program Files/Git/bin/git.exe")
    } else {
        PathBuf::from("git")
    }
}

// ---------------------------------------------------------------------------
// GitExecutor
// ---------------------------------------------------------------------------

/// [`CommandExecutor`] backed by `std::process::Command`.
///
/// stdin is closed and `GIT_TERMINAL_PROMPT=0` is set so a credential prompt
/// fails the command instead of hanging the worker.
#[derive(Debug, Clone)]
pub struct GitExecutor {
    git: PathBuf,
}

impl GitExecutor {
    pub fn new(git: impl Into<PathBuf>) -> Self {
        Self { git: git.into() }
    }

    /// Uses the settings' `git_command` override, else [`default_git_command`].
    pub fn for_settings(settings: &Settings) -> Self {
        Self::new(
            settings
                .git_command
                .clone()
                .unwrap_or_else(default_git_command),
        )
    }

    pub fn git(&self) -> &Path {
        &self.git
    }
}

impl Default for GitExecutor {
    fn default() -> Self {
        Self::new(default_git_command())
    }
}

impl CommandExecutor for GitExecutor {
    fn execute(&self, workdir: &Path, op: &GitOp) -> CommandResult {
        let command = format!("{} {}", self.git.display(), op);
        tracing::debug!("running `{command}` in {}", workdir.display());

        let output = Command::new(&self.git)
            .args(op.args())
            .current_dir(workdir)
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .output();

        let result = match output {
            Ok(output) => match output.status.code() {
                Some(code) => CommandResult::exited(command, code, output.stdout, output.stderr),
                None => CommandResult::crashed(command, output.stderr),
            },
            Err(e) => CommandResult::crashed(command, format!("failed to start git: {e}")),
        };

        if result.has_error {
            tracing::debug!(
                "`{}` failed with exit code {:?}",
                result.command,
                result.exit_code
            );
        }
        result
    }
}
