//! Git subcommands issued by reposync.
//!
//! The argument shapes here are a compatibility contract: they are passed to
//! git verbatim, one argv element per entry.

use std::fmt;

/// One git invocation, minus the binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GitOp {
    /// `status --porcelain`
    Status,
    /// `add -A`
    AddAll,
    /// `commit -m <message>`
    Commit { message: String },
    /// `symbolic-ref --quiet --short HEAD`
    CurrentBranch,
    /// `remote get-url <remote>`
    RemoteUrl { remote: String },
    /// `fetch <remote> <branch>`
    Fetch { remote: String, branch: String },
    /// `rev-list --count --left-right <reference>...HEAD`
    CompareWithHead { reference: String },
    /// `push <remote> <branch>:<branch>`
    Push { remote: String, branch: String },
    /// `merge --ff --ff-only <remote>/<branch>`
    FastForwardMerge { remote: String, branch: String },
    /// `rebase <remote>/<branch>`
    Rebase { remote: String, branch: String },
}

impl GitOp {
    pub fn args(&self) -> Vec<String> {
        let args: Vec<String> = match self {
            GitOp::Status => vec!["status".into(), "--porcelain".into()],
            GitOp::AddAll => vec!["add".into(), "-A".into()],
            GitOp::Commit { message } => vec!["commit".into(), "-m".into(), message.clone()],
            GitOp::CurrentBranch => vec![
                "symbolic-ref".into(),
                "--quiet".into(),
                "--short".into(),
                "HEAD".into(),
            ],
            GitOp::RemoteUrl { remote } => vec!["remote".into(), "get-url".into(), remote.clone()],
            GitOp::Fetch { remote, branch } => {
                vec!["fetch".into(), remote.clone(), branch.clone()]
            }
            GitOp::CompareWithHead { reference } => vec![
                "rev-list".into(),
                "--count".into(),
                "--left-right".into(),
                format!("{reference}...HEAD"),
            ],
            GitOp::Push { remote, branch } => {
                vec!["push".into(), remote.clone(), format!("{branch}:{branch}")]
            }
            GitOp::FastForwardMerge { remote, branch } => vec![
                "merge".into(),
                "--ff".into(),
                "--ff-only".into(),
                format!("{remote}/{branch}"),
            ],
            GitOp::Rebase { remote, branch } => {
                vec!["rebase".into(), format!("{remote}/{branch}")]
            }
        };
        args
    }

    /// Short name of the subcommand, used in log fields.
    pub fn name(&self) -> &'static str {
        match self {
            GitOp::Status => "status",
            GitOp::AddAll => "add",
            GitOp::Commit { .. } => "commit",
            GitOp::CurrentBranch => "symbolic-ref",
            GitOp::RemoteUrl { .. } => "remote",
            GitOp::Fetch { .. } => "fetch",
            GitOp::CompareWithHead { .. } => "rev-list",
            GitOp::Push { .. } => "push",
            GitOp::FastForwardMerge { .. } => "merge",
            GitOp::Rebase { .. } => "rebase",
        }
    }

    /// `true` for operations that change the local repository or the remote.
    pub fn is_mutating(&self) -> bool {
        matches!(
            self,
            GitOp::AddAll
                | GitOp::Commit { .. }
                | GitOp::Push { .. }
                | GitOp::FastForwardMerge { .. }
                | GitOp::Rebase { .. }
        )
    }
}

impl fmt::Display for GitOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self
            .args()
            .into_iter()
            .map(|arg| {
                if arg.contains(char::is_whitespace) || arg.is_empty() {
                    format!("\"{}\"", arg.replace('"', "\\\""))
                } else {
                    arg
                }
            })
            .collect();
        f.write_str(&rendered.join(" "))
    }
}
