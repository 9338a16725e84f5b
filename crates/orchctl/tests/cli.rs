//! End-to-end tests for the orchctl binary against a temporary snapshot file.

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;
use tempfile::TempDir;

/// orchctl pinned to a snapshot file under `dir`, isolated from any
/// local config or environment overrides.
fn orchctl(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("orchctl").unwrap();
    cmd.current_dir(dir)
        .env_remove("ORCHESTORE_BACKEND")
        .env_remove("ORCHESTORE_DIR")
        .env_remove("ORCHESTORE_FILE")
        .env_remove("ORCHESTORE_STATE_FILE")
        .env_remove("ORCHESTORE_KEY")
        .env("ORCHESTORE_LOG_LEVEL", "warn")
        .env("XDG_CONFIG_HOME", dir.join("xdg"));
    cmd
}

#[test]
fn show_on_fresh_store_prints_empty_object() {
    let temp_dir = TempDir::new().unwrap();

    orchctl(temp_dir.path())
        .arg("show")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("{}"));

    // Reading must not create anything.
    assert!(!temp_dir.path().join("data").exists());
}

#[test]
fn set_show_unset_clear_round_trip() {
    let temp_dir = TempDir::new().unwrap();
    let snapshot_path = temp_dir.path().join("data/orchestrator/store.json");

    orchctl(temp_dir.path())
        .args(["set", "overdueCount", "3"])
        .assert()
        .success();
    assert!(snapshot_path.exists());

    orchctl(temp_dir.path())
        .args(["set", "lastView", "unpaid-q3"])
        .assert()
        .success();

    orchctl(temp_dir.path())
        .arg("show")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"overdueCount\": 3"))
        .stdout(predicate::str::contains("\"lastView\": \"unpaid-q3\""));

    orchctl(temp_dir.path())
        .args(["unset", "overdueCount"])
        .assert()
        .success()
        .stdout(predicate::str::contains("overdueCount").not());

    orchctl(temp_dir.path()).arg("clear").assert().success();
    assert!(!snapshot_path.exists());

    orchctl(temp_dir.path()).arg("clear").assert().success();
}

#[test]
fn save_rejects_non_objects() {
    let temp_dir = TempDir::new().unwrap();

    orchctl(temp_dir.path())
        .args(["save", "[1, 2, 3]"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("JSON object"));

    orchctl(temp_dir.path())
        .args(["save", "{\"a\": 1}"])
        .assert()
        .success();
}

#[test]
fn path_flag_overrides_snapshot_file() {
    let temp_dir = TempDir::new().unwrap();
    let custom = temp_dir.path().join("elsewhere/snap.json");

    orchctl(temp_dir.path())
        .arg("--path")
        .arg(&custom)
        .args(["save", "{\"filters\": []}"])
        .assert()
        .success();

    assert!(custom.exists());
    assert!(!temp_dir.path().join("data").exists());
}

#[test]
fn relative_path_flag_is_relative_to_current_dir() {
    let temp_dir = TempDir::new().unwrap();

    orchctl(temp_dir.path())
        .args(["--path", "snap.json", "save", "{\"filters\": []}"])
        .assert()
        .success();

    assert!(temp_dir.path().join("snap.json").exists());
    assert!(!temp_dir.path().join("data").exists());

    orchctl(temp_dir.path())
        .args(["--path", "snap.json", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            temp_dir.path().canonicalize().unwrap().join("snap.json").display().to_string(),
        ));
}

#[test]
fn corrupt_snapshot_is_reported() {
    let temp_dir = TempDir::new().unwrap();
    let dir = temp_dir.path().join("data/orchestrator");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("store.json"), "{ nope").unwrap();

    orchctl(temp_dir.path())
        .arg("show")
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to parse"));
}

#[test]
fn state_on_fresh_store_prints_defaults() {
    let temp_dir = TempDir::new().unwrap();

    orchctl(temp_dir.path())
        .arg("state")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"version\": 1"))
        .stdout(predicate::str::contains("\"workflows\": []"));
}

#[test]
fn config_reads_local_file() {
    let temp_dir = TempDir::new().unwrap();
    std::fs::write(
        temp_dir.path().join("orchestore.toml"),
        "[store]\ndirectory = \"/srv/dashboard\"\n",
    )
    .unwrap();

    orchctl(temp_dir.path())
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("directory = \"/srv/dashboard\""))
        .stdout(predicate::str::contains("# from file: orchestore.toml"));

    orchctl(temp_dir.path())
        .arg("path")
        .assert()
        .success()
        .stdout(predicate::str::contains("/srv/dashboard/store.json"));
}
