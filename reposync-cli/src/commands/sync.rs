//! `reposync sync`: refresh now, through the daemon or in the foreground.

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;

use reposync_core::RepoName;
use reposync_daemon::{request_sync, run_once_blocking, DaemonError};
use reposync_sync::{JobReport, Outcome};

use super::{home, START_DAEMON_HINT};

/// Arguments for `reposync sync`.
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Repository to refresh (omit when using `--all`).
    pub repo: Option<String>,

    /// Refresh every configured repository, in configuration order.
    #[arg(long, conflicts_with = "repo")]
    pub all: bool,

    /// Run in this process until done instead of asking the daemon.
    #[arg(long)]
    pub once: bool,
}

impl SyncArgs {
    pub fn run(self) -> Result<()> {
        let home = home()?;
        if self.repo.is_none() && !self.all {
            bail!("provide a repository name or use --all");
        }
        let target = self.repo.clone().map(RepoName::from);

        if self.once {
            let reports = run_once_blocking(&home, target).context("sync failed")?;
            if reports.is_empty() {
                println!("No repositories configured. Run `reposync repo add` first.");
            }
            for report in &reports {
                print_report(report);
            }
            if reports.iter().any(|r| r.outcome == Outcome::Failure) {
                bail!("one or more repositories failed to sync");
            }
            return Ok(());
        }

        let label = self.repo.clone().unwrap_or_else(|| "all".to_string());
        match request_sync(&home, self.repo) {
            Ok(enqueued) if enqueued.is_empty() => {
                println!("Nothing new queued for '{label}' (already refreshing)");
            }
            Ok(enqueued) => {
                let names: Vec<&str> = enqueued.iter().map(RepoName::as_str).collect();
                println!("✓ Queued {}", names.join(", "));
            }
            Err(err @ DaemonError::DaemonNotRunning { .. }) => {
                return Err(err).context(format!("{START_DAEMON_HINT}, or pass --once"));
            }
            Err(err) => return Err(err).with_context(|| format!("sync request failed for '{label}'")),
        }
        Ok(())
    }
}

fn print_report(report: &JobReport) {
    match report.outcome {
        Outcome::Success => println!(
            "{} '{}' in sync ({} steps, {} git commands)",
            "✓".green().bold(),
            report.repo,
            report.steps,
            report.commands
        ),
        Outcome::Failure => {
            println!(
                "{} '{}' failed at step {}",
                "✗".red().bold(),
                report.repo,
                report.final_state
            );
            if !report.summary.is_empty() {
                println!("  {}", report.summary);
            }
            println!("  Run `reposync log {}` for details.", report.repo);
        }
    }
}
