//! reposync: keep git working copies in sync with their upstream.
//!
//! # Usage
//!
//! ```text
//! reposync repo add <name> <path> [--interval <mins>] [--force]
//! reposync repo list [--json]
//! reposync repo remove <name>
//! reposync repo rename <name> <new-name>
//! reposync repo interval <name> <mins>
//! reposync client-name [NAME]
//! reposync sync [REPO] [--all] [--once]
//! reposync pause <REPO>
//! reposync status [--json]
//! reposync log <REPO>
//! reposync watch
//! reposync daemon start|stop|status
//! ```

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{
    client_name::ClientNameArgs, daemon::DaemonCommand, log::LogArgs, pause::PauseArgs,
    repo::RepoCommand, status::StatusArgs, sync::SyncArgs,
};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "reposync",
    version,
    about = "Commit, fetch, integrate and push git repositories on a schedule",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Manage the configured repositories.
    Repo {
        #[command(subcommand)]
        command: RepoCommand,
    },

    /// Show or set the name used in automatic commit messages.
    ClientName(ClientNameArgs),

    /// Refresh one repository, or all of them, now.
    Sync(SyncArgs),

    /// Stop a repository's auto-refresh timer.
    Pause(PauseArgs),

    /// Show the status of every repository.
    Status(StatusArgs),

    /// Print a repository's status log.
    Log(LogArgs),

    /// Stream state changes from the daemon until interrupted.
    Watch,

    /// Manage the reposync background daemon.
    Daemon {
        #[command(subcommand)]
        command: DaemonCommand,
    },
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Repo { command } => commands::repo::run(command),
        Commands::ClientName(args) => args.run(),
        Commands::Sync(args) => args.run(),
        Commands::Pause(args) => args.run(),
        Commands::Status(args) => args.run(),
        Commands::Log(args) => args.run(),
        Commands::Watch => commands::watch::run(),
        Commands::Daemon { command } => commands::daemon::run(command),
    }
}
