//! YAML settings store.
//!
//! # Storage layout
//!
//! ```text
//! ~/.reposync/
//!   settings.yaml   (mode 0600, directory mode 0700)
//! ```
//!
//! # API pattern
//!
//! Every function has two forms:
//! - `fn_at(home: &Path, …)`: explicit home; used in tests with `TempDir`
//! - `fn(…)`: derives home from `dirs::home_dir()`, delegates to `_at`
//!
//! Tests must NEVER call the no-arg wrappers; always use `_at`.

use std::path::{Path, PathBuf};

use crate::error::SettingsError;
use crate::types::{RepoName, RepositoryConfig, Settings};

pub const SETTINGS_FILE: &str = "settings.yaml";

// ---------------------------------------------------------------------------
// 1. Path helpers
// ---------------------------------------------------------------------------

/// `<home>/.reposync/`
pub fn config_dir_at(home: &Path) -> PathBuf {
    home.join(".reposync")
}

/// `<home>/.reposync/settings.yaml`: pure, no I/O.
pub fn settings_path_at(home: &Path) -> PathBuf {
    config_dir_at(home).join(SETTINGS_FILE)
}

/// `settings_path_at` convenience wrapper.
pub fn settings_path() -> Result<PathBuf, SettingsError> {
    Ok(settings_path_at(&home()?))
}

// ---------------------------------------------------------------------------
// 2. Load / save
// ---------------------------------------------------------------------------

/// Load settings from `<home>/.reposync/settings.yaml`.
///
/// A missing file is not an error: it yields [`Settings::default`].
/// Malformed YAML returns `SettingsError::Parse` with path and line context.
pub fn load_at(home: &Path) -> Result<Settings, SettingsError> {
    let path = settings_path_at(home);
    if !path.exists() {
        return Ok(Settings::default());
    }
    let contents = std::fs::read_to_string(&path)?;
    if contents.trim().is_empty() {
        return Ok(Settings::default());
    }
    serde_yaml::from_str(&contents).map_err(|e| SettingsError::Parse { path, source: e })
}

/// `load_at` convenience wrapper.
pub fn load() -> Result<Settings, SettingsError> {
    load_at(&home()?)
}

/// Atomically save settings.
///
/// Write flow: fill in a default client name if blank → serialize → `.yaml.tmp`
/// sibling → `chmod 0600` → `rename`.
pub fn save_at(home: &Path, settings: &Settings) -> Result<(), SettingsError> {
    let dir = config_dir_at(home);
    if !dir.exists() {
        std::fs::create_dir_all(&dir)?;
        set_dir_permissions(&dir)?;
    }

    let mut settings = settings.clone();
    settings.client_name = settings.effective_client_name();

    let path = settings_path_at(home);
    let tmp_path = path.with_file_name(format!("{SETTINGS_FILE}.tmp"));
    let yaml = serde_yaml::to_string(&settings)?;
    std::fs::write(&tmp_path, yaml)?;
    set_file_permissions(&tmp_path)?;
    std::fs::rename(&tmp_path, &path)?;
    Ok(())
}

/// `save_at` convenience wrapper.
pub fn save(settings: &Settings) -> Result<(), SettingsError> {
    save_at(&home()?, settings)
}

// ---------------------------------------------------------------------------
// 3. Mutations (load → change → save)
// ---------------------------------------------------------------------------

/// Append a repository. Names must be unique.
pub fn add_repo_at(home: &Path, repo: RepositoryConfig) -> Result<Settings, SettingsError> {
    update_at(home, |settings| {
        if settings.repo(&repo.name).is_some() {
            return Err(SettingsError::DuplicateRepo { name: repo.name });
        }
        settings.repos.push(repo);
        Ok(())
    })
}

/// `add_repo_at` convenience wrapper.
pub fn add_repo(repo: RepositoryConfig) -> Result<Settings, SettingsError> {
    add_repo_at(&home()?, repo)
}

pub fn remove_repo_at(home: &Path, name: &RepoName) -> Result<Settings, SettingsError> {
    update_at(home, |settings| {
        let before = settings.repos.len();
        settings.repos.retain(|r| &r.name != name);
        if settings.repos.len() == before {
            return Err(SettingsError::RepoNotFound { name: name.clone() });
        }
        Ok(())
    })
}

/// `remove_repo_at` convenience wrapper.
pub fn remove_repo(name: &RepoName) -> Result<Settings, SettingsError> {
    remove_repo_at(&home()?, name)
}

pub fn rename_repo_at(
    home: &Path,
    name: &RepoName,
    new_name: RepoName,
) -> Result<Settings, SettingsError> {
    update_at(home, |settings| {
        if settings.repo(&new_name).is_some() {
            return Err(SettingsError::DuplicateRepo { name: new_name });
        }
        let repo = settings
            .repo_mut(name)
            .ok_or_else(|| SettingsError::RepoNotFound { name: name.clone() })?;
        repo.name = new_name;
        Ok(())
    })
}

/// `rename_repo_at` convenience wrapper.
pub fn rename_repo(name: &RepoName, new_name: RepoName) -> Result<Settings, SettingsError> {
    rename_repo_at(&home()?, name, new_name)
}

pub fn set_interval_at(
    home: &Path,
    name: &RepoName,
    minutes: u32,
) -> Result<Settings, SettingsError> {
    update_at(home, |settings| {
        let repo = settings
            .repo_mut(name)
            .ok_or_else(|| SettingsError::RepoNotFound { name: name.clone() })?;
        repo.refresh_interval_minutes = minutes;
        Ok(())
    })
}

/// `set_interval_at` convenience wrapper.
pub fn set_interval(name: &RepoName, minutes: u32) -> Result<Settings, SettingsError> {
    set_interval_at(&home()?, name, minutes)
}

pub fn set_client_name_at(home: &Path, client_name: &str) -> Result<Settings, SettingsError> {
    let client_name = client_name.trim().to_string();
    update_at(home, move |settings| {
        settings.client_name = client_name;
        Ok(())
    })
}

/// `set_client_name_at` convenience wrapper.
pub fn set_client_name(client_name: &str) -> Result<Settings, SettingsError> {
    set_client_name_at(&home()?, client_name)
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

fn update_at(
    home: &Path,
    change: impl FnOnce(&mut Settings) -> Result<(), SettingsError>,
) -> Result<Settings, SettingsError> {
    let mut settings = load_at(home)?;
    change(&mut settings)?;
    save_at(home, &settings)?;
    load_at(home)
}

fn home() -> Result<PathBuf, SettingsError> {
    dirs::home_dir().ok_or(SettingsError::HomeNotFound)
}

#[cfg(unix)]
fn set_dir_permissions(path: &Path) -> Result<(), SettingsError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700))?;
    Ok(())
}
#[cfg(not(unix))]
fn set_dir_permissions(_path: &Path) -> Result<(), SettingsError> {
    Ok(())
}

#[cfg(unix)]
fn set_file_permissions(path: &Path) -> Result<(), SettingsError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    Ok(())
}
#[cfg(not(unix))]
fn set_file_permissions(_path: &Path) -> Result<(), SettingsError> {
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
