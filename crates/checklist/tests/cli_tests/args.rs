//! CLI argument tests.

use super::{TestResult, checklist, write_run_snapshot};
use predicates::prelude::*;
use tempfile::TempDir;

#[test]
fn test_arg_help() {
    checklist()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Inspect and run behavioral test snapshots",
        ));
}

#[test]
fn test_arg_version() {
    checklist()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("checklist"));
}

#[test]
fn test_arg_missing_subcommand() {
    checklist().assert().failure();
}

#[test]
fn test_arg_stats_requires_path() {
    checklist().arg("stats").assert().failure();
}

#[test]
fn test_arg_invalid_format() -> TestResult {
    let dir = TempDir::new()?;
    let path = dir.path().join("t.json");
    write_run_snapshot(&path, None)?;

    checklist()
        .current_dir(dir.path())
        .arg("stats")
        .arg(&path)
        .args(["--format", "invalid"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Invalid format"));
    Ok(())
}

#[test]
fn test_arg_invalid_aggregation() -> TestResult {
    let dir = TempDir::new()?;
    let path = dir.path().join("t.json");
    write_run_snapshot(&path, None)?;

    checklist()
        .current_dir(dir.path())
        .arg("stats")
        .arg(&path)
        .args(["--aggregation", "most"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("unknown aggregation policy"));
    Ok(())
}

#[test]
fn test_arg_invalid_config_file() -> TestResult {
    let dir = TempDir::new()?;
    let path = dir.path().join("t.json");
    write_run_snapshot(&path, None)?;
    std::fs::write(dir.path().join("checklist.config.yaml"), "nsamples: 0\n")?;

    checklist()
        .arg("--config-dir")
        .arg(dir.path())
        .arg("stats")
        .arg(&path)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("nsamples must be at least 1"));
    Ok(())
}
