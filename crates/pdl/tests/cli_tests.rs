use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tracing::info;

#[test]
fn test_help_command() {
    pdl_common::logging::ensure_test_logging(None);
    info!("Testing CLI help command");

    let mut cmd = Command::cargo_bin("pdl").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("PHP Debug Log"))
        .stdout(predicate::str::contains("--port"))
        .stdout(predicate::str::contains("--output"));
}

#[test]
fn test_version_command() {
    pdl_common::logging::ensure_test_logging(None);
    info!("Running test");
    let mut cmd = Command::cargo_bin("pdl").unwrap();
    cmd.arg("--version").assert().success().stdout(predicate::str::contains("pdl"));
}

#[test]
fn test_missing_config() {
    pdl_common::logging::ensure_test_logging(None);
    info!("Running test");
    let mut cmd = Command::cargo_bin("pdl").unwrap();
    cmd.assert().failure().stderr(predicate::str::contains("Usage"));
}

#[test]
fn test_nonexistent_config() {
    pdl_common::logging::ensure_test_logging(None);
    info!("Running test");
    let dir = tempfile::tempdir().unwrap();
    let mut cmd = Command::cargo_bin("pdl").unwrap();
    cmd.arg(dir.path().join("missing.json"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read config file"));
}

#[test]
fn test_config_without_files() {
    pdl_common::logging::ensure_test_logging(None);
    info!("Running test");
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("pdl.json");
    fs::write(&config, r#"{"files": []}"#).unwrap();

    let mut cmd = Command::cargo_bin("pdl").unwrap();
    cmd.arg(&config).assert().failure().stderr(predicate::str::contains("lists no files"));
}

#[test]
fn test_invalid_port() {
    pdl_common::logging::ensure_test_logging(None);
    info!("Running test");
    let mut cmd = Command::cargo_bin("pdl").unwrap();
    cmd.args(["--port", "not-a-port", "pdl.json"]).assert().failure();
}
