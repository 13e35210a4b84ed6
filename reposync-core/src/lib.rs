//! reposync core library: configuration types, settings persistence, errors.
//!
//! - [`types`] - newtypes and configuration structs
//! - [`error`] - [`SettingsError`]
//! - [`settings`] - load / save / mutate the settings file

pub mod error;
pub mod settings;
pub mod types;

pub use error::SettingsError;
pub use types::{RepoName, RepositoryConfig, Settings, DEFAULT_REFRESH_INTERVAL_MINUTES};
