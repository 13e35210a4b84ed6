//! `reposync repo add|list|remove|rename|interval`
//!
//! These only edit `~/.reposync/settings.yaml`; a running daemon picks the
//! change up through its settings watcher.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use reposync_core::{settings, RepoName, RepositoryConfig, DEFAULT_REFRESH_INTERVAL_MINUTES};
use reposync_git::{GitExecutor, GitRepo};
use reposync_sync::job::DEFAULT_REMOTE;

#[derive(Subcommand, Debug)]
pub enum RepoCommand {
    /// Add a working copy to the sync list.
    Add(AddArgs),

    /// List configured repositories.
    List(ListArgs),

    /// Stop syncing a repository. The working copy is left untouched.
    Remove { name: String },

    /// Change a repository's display name.
    Rename { name: String, new_name: String },

    /// Set the auto-refresh interval in minutes (0 disables it).
    Interval { name: String, minutes: u32 },
}

#[derive(Args, Debug)]
pub struct AddArgs {
    /// Unique display name (e.g. "notes").
    pub name: String,

    /// Path to the working copy.
    pub path: PathBuf,

    /// Auto-refresh interval in minutes; 0 disables auto-refresh.
    #[arg(long, short = 'i', default_value_t = DEFAULT_REFRESH_INTERVAL_MINUTES)]
    pub interval: u32,

    /// Add the path even if it does not look like a git repository.
    #[arg(long)]
    pub force: bool,
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

pub fn run(cmd: RepoCommand) -> Result<()> {
    match cmd {
        RepoCommand::Add(args) => add(args),
        RepoCommand::List(args) => list(args),
        RepoCommand::Remove { name } => remove(name),
        RepoCommand::Rename { name, new_name } => rename(name, new_name),
        RepoCommand::Interval { name, minutes } => interval(name, minutes),
    }
}

fn add(args: AddArgs) -> Result<()> {
    let path = std::fs::canonicalize(&args.path)
        .with_context(|| format!("cannot access {}", args.path.display()))?;

    let loaded = settings::load().context("failed to load settings")?;
    let git = GitExecutor::for_settings(&loaded);
    let repo = GitRepo::new(&path, &git);
    if !repo.is_repository() && !args.force {
        bail!(
            "{} is not a git repository (use --force to add it anyway)",
            path.display()
        );
    }

    let config = RepositoryConfig::new(args.name.clone(), path.clone()).with_interval(args.interval);
    settings::add_repo(config)
        .with_context(|| format!("failed to add repository '{}'", args.name))?;

    println!("✓ Added '{}' ({})", args.name, path.display());
    if repo.is_repository() {
        // Informational only; a detached HEAD or missing remote fails the
        // first sync with a proper log entry.
        if let Ok(Some(branch)) = repo.current_branch() {
            let url = repo.remote_url(DEFAULT_REMOTE).ok().flatten();
            match url {
                Some(url) => println!("  {branch} @ {DEFAULT_REMOTE} ({url})"),
                None => println!("  {branch} (no '{DEFAULT_REMOTE}' remote)"),
            }
        }
    }
    Ok(())
}

#[derive(Serialize, Tabled)]
struct RepoRow {
    #[tabled(rename = "name")]
    name: String,
    #[tabled(rename = "path")]
    path: String,
    #[tabled(rename = "refresh")]
    refresh: String,
    #[tabled(skip)]
    refresh_interval_minutes: u32,
}

fn list(args: ListArgs) -> Result<()> {
    let loaded = settings::load().context("failed to load settings")?;

    let rows: Vec<RepoRow> = loaded
        .repos
        .iter()
        .map(|repo| RepoRow {
            name: repo.name.to_string(),
            path: repo.path.display().to_string(),
            refresh: match repo.refresh_interval_minutes {
                0 => "disabled".to_string(),
                minutes => format!("every {minutes} mins"),
            },
            refresh_interval_minutes: repo.refresh_interval_minutes,
        })
        .collect();

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&rows).context("failed to serialize repository list")?
        );
        return Ok(());
    }

    if rows.is_empty() {
        println!("No repositories configured.");
        println!("Run: reposync repo add <name> <path>");
        return Ok(());
    }

    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
    Ok(())
}

fn remove(name: String) -> Result<()> {
    settings::remove_repo(&RepoName::from(name.clone()))
        .with_context(|| format!("failed to remove repository '{name}'"))?;
    println!("✓ Removed '{name}'");
    Ok(())
}

fn rename(name: String, new_name: String) -> Result<()> {
    settings::rename_repo(&RepoName::from(name.clone()), RepoName::from(new_name.clone()))
        .with_context(|| format!("failed to rename repository '{name}'"))?;
    println!("✓ Renamed '{name}' to '{new_name}'");
    Ok(())
}

fn interval(name: String, minutes: u32) -> Result<()> {
    settings::set_interval(&RepoName::from(name.clone()), minutes)
        .with_context(|| format!("failed to set interval for '{name}'"))?;
    if minutes == 0 {
        println!("✓ Auto-refresh disabled for '{name}'");
    } else {
        println!("✓ '{name}' refreshes every {minutes} mins");
    }
    Ok(())
}
