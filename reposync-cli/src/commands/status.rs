//! `reposync status`: per-repository state from the running daemon.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use reposync_core::settings;
use reposync_daemon::{paths::socket_path, request_status, DaemonError, StatusPayload};
use reposync_sync::{OverallStatus, RepoStatus};

use super::home;

/// Arguments for `reposync status`.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl StatusArgs {
    pub fn run(self) -> Result<()> {
        let home = home()?;
        let status = match request_status(&home) {
            Ok(status) => status,
            Err(DaemonError::DaemonNotRunning { .. }) => {
                return print_offline(&home, self.json);
            }
            Err(err) => return Err(err).context("failed to query daemon status"),
        };

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&status).context("failed to serialize status JSON")?
            );
            return Ok(());
        }
        print_table(&status);
        Ok(())
    }
}

#[derive(Tabled)]
struct StatusTableRow {
    #[tabled(rename = "repository")]
    name: String,
    #[tabled(rename = "status")]
    status: String,
    #[tabled(rename = "branch")]
    branch: String,
    #[tabled(rename = "schedule")]
    schedule: String,
    #[tabled(rename = "last error")]
    summary: String,
}

fn print_table(status: &StatusPayload) {
    println!(
        "reposync v{} | {} | {} repositories | client {}",
        env!("CARGO_PKG_VERSION"),
        paint_overall(status.overall),
        status.repos.len(),
        status.client_name,
    );

    if status.repos.is_empty() {
        println!("No repositories configured.");
        return;
    }

    let rows: Vec<StatusTableRow> = status
        .repos
        .iter()
        .map(|repo| StatusTableRow {
            name: repo.name.to_string(),
            status: paint_status(repo.status),
            branch: repo.branch_remote(),
            schedule: repo.schedule.clone(),
            summary: repo.summary.clone(),
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");

    if status.queued.len() > 1 {
        let waiting: Vec<&str> = status.queued[1..].iter().map(|name| name.as_str()).collect();
        println!("Waiting: {}", waiting.join(", "));
    }
    if status.repos.iter().any(|repo| repo.status == RepoStatus::Error) {
        println!("Run 'reposync log <repository>' to see what went wrong.");
    }
}

fn print_offline(home: &std::path::Path, json: bool) -> Result<()> {
    let loaded = settings::load_at(home).context("failed to load settings")?;
    if json {
        let payload = serde_json::json!({
            "running": false,
            "socket": socket_path(home).display().to_string(),
            "repos": loaded.repos,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&payload).context("failed to serialize status JSON")?
        );
        return Ok(());
    }

    println!("daemon is not running; start it with `reposync daemon start`");
    for repo in &loaded.repos {
        println!("  {} ({})", repo.name, repo.path.display());
    }
    Ok(())
}

pub(crate) fn paint_status(status: RepoStatus) -> String {
    let label = status.to_string();
    match status {
        RepoStatus::Refreshing => label.cyan().bold().to_string(),
        RepoStatus::Error => label.red().bold().to_string(),
        RepoStatus::Ok => label.green().bold().to_string(),
        RepoStatus::Paused => label.bright_black().bold().to_string(),
    }
}

fn paint_overall(status: OverallStatus) -> String {
    let label = status.to_string();
    match status {
        OverallStatus::Refreshing => label.cyan().bold().to_string(),
        OverallStatus::Error => label.red().bold().to_string(),
        OverallStatus::Ok => label.green().bold().to_string(),
    }
}
