//! `reposync client-name [NAME]`

use anyhow::{Context, Result};
use clap::Args;

use reposync_core::settings;

#[derive(Args, Debug)]
pub struct ClientNameArgs {
    /// New name; omit to print the current one. An empty string restores the
    /// `<hostname>/<username>` default.
    pub name: Option<String>,
}

impl ClientNameArgs {
    pub fn run(self) -> Result<()> {
        match self.name {
            None => {
                let loaded = settings::load().context("failed to load settings")?;
                println!("{}", loaded.effective_client_name());
            }
            Some(name) => {
                let saved = settings::set_client_name(&name).context("failed to save client name")?;
                println!("✓ Commits will read \"Changes from {}\"", saved.effective_client_name());
            }
        }
        Ok(())
    }
}
