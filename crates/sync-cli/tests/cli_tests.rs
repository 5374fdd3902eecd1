//! End-to-end tests for the `ide-sync` binary.

use assert_cmd::Command;
use predicates::prelude::*;
use sync_test_utils::TestProject;
use tempfile::tempdir;

/// A command isolated from the user's real configuration directory.
fn ide_sync(config_home: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("ide-sync").expect("Failed to find ide-sync binary");
    cmd.env("XDG_CONFIG_HOME", config_home)
        .env("HOME", config_home)
        .env_remove("IDE_SYNC_CONFIG")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn help_describes_commands() {
    let home = tempdir().unwrap();
    ide_sync(home.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("reconcile"))
        .stdout(predicate::str::contains("watch"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn version_names_binary() {
    let home = tempdir().unwrap();
    ide_sync(home.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("ide-sync"));
}

#[test]
fn config_without_file_shows_defaults() {
    let home = tempdir().unwrap();
    let output = ide_sync(home.path())
        .args(["config", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["source"], "built-in defaults");
    assert_eq!(json["config"]["debounce_ms"], 300);
    assert_eq!(json["config"]["poll_interval_ms"], 2000);
    assert_eq!(json["config"]["excluded_dirs"][0], "vendor");
}

#[test]
fn explicit_config_file_is_used() {
    let home = tempdir().unwrap();
    let config = home.path().join("sync.toml");
    std::fs::write(&config, "debounce_ms = 42\nvfs_root = \"/app\"\n").unwrap();

    ide_sync(home.path())
        .args(["config", "--json", "--config"])
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"debounce_ms\": 42"))
        .stdout(predicate::str::contains("\"/app\""));
}

#[test]
fn invalid_config_is_rejected() {
    let home = tempdir().unwrap();
    let config = home.path().join("sync.json");
    std::fs::write(&config, r#"{"poll_interval_ms": 0}"#).unwrap();

    ide_sync(home.path())
        .args(["config", "--config"])
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("poll_interval_ms"));
}

#[test]
fn missing_explicit_config_is_an_error() {
    let home = tempdir().unwrap();
    ide_sync(home.path())
        .args(["config", "--config", "does-not-exist.toml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn reconcile_merges_seed_with_local_copy_winning() {
    let home = tempdir().unwrap();
    let project = TestProject::new().with_file("a.txt", "local");
    let seed = TestProject::new()
        .with_file("a.txt", "vfs")
        .with_file("src/b.php", "<?php")
        .with_file("vendor/pkg/x.php", "<?php");

    let output = ide_sync(home.path())
        .arg("reconcile")
        .arg(project.root())
        .arg("--seed")
        .arg(seed.root())
        .arg("--json")
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["status"]["state"], "connected");
    assert_eq!(json["report"]["written_local"][0], "src/b.php");
    assert_eq!(json["report"]["written_vfs"][0], "a.txt");

    assert_eq!(project.read("a.txt"), "local");
    assert_eq!(project.read("src/b.php"), "<?php");
    project.assert_file_not_exists("vendor/pkg/x.php");
}

#[test]
fn reconcile_human_output_lists_written_files() {
    let home = tempdir().unwrap();
    let project = TestProject::new();
    let seed = TestProject::new().with_file("index.php", "<?php");

    ide_sync(home.path())
        .arg("reconcile")
        .arg(project.root())
        .arg("--seed")
        .arg(seed.root())
        .assert()
        .success()
        .stdout(predicate::str::contains("connected"))
        .stdout(predicate::str::contains("index.php"));
}

#[test]
fn reconcile_missing_directory_fails() {
    let home = tempdir().unwrap();
    ide_sync(home.path())
        .args(["reconcile"])
        .arg(home.path().join("absent"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}
