//! Settings store error-message, atomic-write-safety, and mutation tests.
//! Storage: ~/.reposync/settings.yaml

use assert_fs::prelude::*;
use predicates::prelude::predicate;
use reposync_core::{
    settings,
    types::{RepoName, RepositoryConfig},
    Settings, SettingsError,
};
use rstest::rstest;
use std::fs;

fn notes() -> RepositoryConfig {
    RepositoryConfig::new("notes", "/home/alice/notes")
}

// ---------------------------------------------------------------------------
// 1. Load error messages
// ---------------------------------------------------------------------------

#[test]
fn load_corrupt_yaml_returns_parse_error_with_path() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    home.child(".reposync/settings.yaml")
        .write_str(": : corrupt : yaml : !!!\n  - broken: [unclosed")
        .expect("write");

    let err = settings::load_at(home.path()).unwrap_err();
    assert!(matches!(err, SettingsError::Parse { .. }), "got: {err}");
    assert!(err.to_string().contains("settings.yaml"));
}

#[test]
fn load_wrong_type_yaml_returns_parse_error() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    home.child(".reposync/settings.yaml")
        .write_str("- this is a list, not a mapping\n")
        .expect("write");

    let err = settings::load_at(home.path()).unwrap_err();
    assert!(matches!(err, SettingsError::Parse { .. }), "got: {err}");
}

#[test]
fn load_accepts_hand_written_file() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    home.child(".reposync/settings.yaml")
        .write_str(
            "client_name: laptop/alice\nrepos:\n  - name: notes\n    path: /home/alice/notes\n  - name: dots\n    path: /home/alice/dots\n    refresh_interval_minutes: 0\n",
        )
        .expect("write");

    let loaded = settings::load_at(home.path()).expect("load");
    assert_eq!(loaded.client_name, "laptop/alice");
    assert_eq!(loaded.repos.len(), 2);
    assert_eq!(loaded.repos[0].refresh_interval_minutes, 60);
    assert_eq!(loaded.repos[1].refresh_interval(), None);
    assert!(loaded.git_command.is_none());
}

// ---------------------------------------------------------------------------
// 2. Atomic write safety
// ---------------------------------------------------------------------------

#[test]
fn save_writes_owner_only_file() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    settings::save_at(home.path(), &Settings::default()).expect("save");

    home.child(".reposync/settings.yaml")
        .assert(predicate::path::exists());

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let path = settings::settings_path_at(home.path());
        let mode = fs::metadata(&path).expect("meta").permissions().mode() & 0o777;
        assert_eq!(mode, 0o600, "expected 0600, got {mode:o}");
    }
}

#[test]
fn mid_write_crash_leaves_original_intact() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    settings::add_repo_at(home.path(), notes()).expect("add");

    let path = settings::settings_path_at(home.path());
    let original_bytes = fs::read(&path).expect("read original");

    // Simulate crash: .tmp written but process died before rename
    let tmp = path.with_file_name("settings.yaml.tmp");
    fs::write(&tmp, b"CRASH - INCOMPLETE WRITE").expect("write crash tmp");

    assert_eq!(original_bytes, fs::read(&path).expect("read after crash"));
    let loaded = settings::load_at(home.path()).expect("load after crash");
    assert_eq!(loaded.repos.len(), 1);
}

// ---------------------------------------------------------------------------
// 3. Mutations
// ---------------------------------------------------------------------------

#[test]
fn add_repo_keeps_configuration_order() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    settings::add_repo_at(home.path(), RepositoryConfig::new("zeta", "/z")).expect("add zeta");
    let loaded =
        settings::add_repo_at(home.path(), RepositoryConfig::new("alpha", "/a")).expect("add");

    let names: Vec<&str> = loaded.repos.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, ["zeta", "alpha"]);
}

#[test]
fn add_duplicate_repo_errors() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    settings::add_repo_at(home.path(), notes()).expect("first add");
    let err = settings::add_repo_at(home.path(), notes()).unwrap_err();
    assert!(matches!(err, SettingsError::DuplicateRepo { .. }), "got: {err}");
    assert!(err.to_string().contains("notes"));
}

#[test]
fn remove_unknown_repo_errors() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    let err = settings::remove_repo_at(home.path(), &RepoName::from("ghost")).unwrap_err();
    assert!(matches!(err, SettingsError::RepoNotFound { .. }), "got: {err}");
}

#[test]
fn remove_repo_drops_entry() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    settings::add_repo_at(home.path(), notes()).expect("add");
    let loaded = settings::remove_repo_at(home.path(), &RepoName::from("notes")).expect("remove");
    assert!(loaded.repos.is_empty());
}

#[test]
fn rename_to_existing_name_errors() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    settings::add_repo_at(home.path(), notes()).expect("add notes");
    settings::add_repo_at(home.path(), RepositoryConfig::new("dots", "/d")).expect("add dots");

    let err = settings::rename_repo_at(home.path(), &RepoName::from("dots"), RepoName::from("notes"))
        .unwrap_err();
    assert!(matches!(err, SettingsError::DuplicateRepo { .. }), "got: {err}");
}

#[test]
fn rename_repo_keeps_path() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    settings::add_repo_at(home.path(), notes()).expect("add");
    let loaded =
        settings::rename_repo_at(home.path(), &RepoName::from("notes"), RepoName::from("journal"))
            .expect("rename");
    let repo = loaded.repo(&RepoName::from("journal")).expect("renamed repo");
    assert_eq!(repo.path, notes().path);
}

#[rstest]
#[case(0)]
#[case(1)]
#[case(15)]
#[case(1000)]
fn set_interval_persists(#[case] minutes: u32) {
    let home = assert_fs::TempDir::new().expect("tempdir");
    settings::add_repo_at(home.path(), notes()).expect("add");
    settings::set_interval_at(home.path(), &RepoName::from("notes"), minutes).expect("set");

    let loaded = settings::load_at(home.path()).expect("load");
    assert_eq!(loaded.repos[0].refresh_interval_minutes, minutes);
}

#[test]
fn set_client_name_trims_and_persists() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    settings::set_client_name_at(home.path(), "  desk/bob  ").expect("set");
    let loaded = settings::load_at(home.path()).expect("load");
    assert_eq!(loaded.client_name, "desk/bob");
}
