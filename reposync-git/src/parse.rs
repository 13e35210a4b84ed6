//! Interpreters that map a [`CommandResult`] onto a typed result.
//!
//! Every function takes the result by value so a failure can carry the raw
//! output to the status log without cloning.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::executor::CommandResult;

/// A git command that failed, with its full captured output.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("`{}` failed (exit code {})", result.command, result.exit_code.unwrap_or(-1))]
pub struct GitFailure {
    pub result: CommandResult,
}

impl GitFailure {
    pub fn report(&self) -> String {
        self.result.report()
    }
}

impl From<CommandResult> for GitFailure {
    fn from(result: CommandResult) -> Self {
        Self { result }
    }
}

/// Relationship of local `HEAD` to its upstream ref.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareOutcome {
    NoUpstream,
    Equal,
    Ahead,
    Behind,
    Diverged,
}

/// Classify the `behind ahead` pair printed by `rev-list --count --left-right`.
///
/// Output is whitespace-normalised and split on single spaces; the left value
/// counts commits only on the upstream side, the right value commits only on
/// `HEAD`. Anything not recognised as a clean case is [`CompareOutcome::Diverged`].
pub fn classify_counts(output: &str) -> CompareOutcome {
    let simplified = output.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut parts = simplified.split(' ');
    let behind = parts.next().unwrap_or("");
    let ahead = parts.next().unwrap_or("");

    match (behind, ahead) {
        ("", "") => CompareOutcome::NoUpstream,
        ("0", "0") => CompareOutcome::Equal,
        ("0", _) => CompareOutcome::Ahead,
        (_, "0") => CompareOutcome::Behind,
        _ => CompareOutcome::Diverged,
    }
}

/// `Ok(())` unless the command failed.
pub fn completed(result: CommandResult) -> Result<(), GitFailure> {
    if result.has_error {
        Err(result.into())
    } else {
        Ok(())
    }
}

/// `status --porcelain`: any output means uncommitted changes.
pub fn is_modified(result: CommandResult) -> Result<bool, GitFailure> {
    if result.has_error {
        return Err(result.into());
    }
    Ok(!result.stdout_text().trim().is_empty())
}

/// `symbolic-ref --quiet --short HEAD`: `None` on a detached head.
pub fn current_branch(result: CommandResult) -> Result<Option<String>, GitFailure> {
    single_line(result)
}

/// `remote get-url <remote>`: `None` when git printed nothing.
pub fn remote_url(result: CommandResult) -> Result<Option<String>, GitFailure> {
    single_line(result)
}

pub fn compare_outcome(result: CommandResult) -> Result<CompareOutcome, GitFailure> {
    if result.has_error {
        return Err(result.into());
    }
    Ok(classify_counts(&result.stdout_text()))
}

fn single_line(result: CommandResult) -> Result<Option<String>, GitFailure> {
    if result.has_error {
        return Err(result.into());
    }
    let text = result.stdout_text();
    let line = text.trim();
    Ok((!line.is_empty()).then(|| line.to_string()))
}
