//! `checklist stats` tests.

use super::{TestResult, checklist, write_fresh_snapshot, write_run_snapshot};
use predicates::prelude::*;
use tempfile::TempDir;

#[test]
fn test_stats_table() -> TestResult {
    let dir = TempDir::new()?;
    let path = dir.path().join("sentiment.json");
    write_run_snapshot(&path, Some("sentiment"))?;

    checklist()
        .current_dir(dir.path())
        .arg("stats")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("sentiment"))
        .stdout(predicate::str::contains("Test cases:      4"))
        .stdout(predicate::str::contains("Fails (rate):    1 (25.0%)"));
    Ok(())
}

#[test]
fn test_stats_json() -> TestResult {
    let dir = TempDir::new()?;
    let path = dir.path().join("unnamed.json");
    write_run_snapshot(&path, None)?;

    let output = checklist()
        .current_dir(dir.path())
        .arg("stats")
        .arg(&path)
        .args(["--format", "json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let report: serde_json::Value = serde_json::from_slice(&output)?;
    assert_eq!(report["tests"][0]["name"], "unnamed");
    assert_eq!(report["tests"][0]["total"], 4);
    assert_eq!(report["tests"][0]["failed"], 1);
    assert_eq!(report["tests"][0]["passed"], 3);
    assert_eq!(report["failing_tests"], 1);
    assert!(report["timestamp"].is_string());
    Ok(())
}

#[test]
fn test_stats_strict_fails_on_failures() -> TestResult {
    let dir = TempDir::new()?;
    let path = dir.path().join("t.json");
    write_run_snapshot(&path, None)?;

    checklist()
        .current_dir(dir.path())
        .arg("stats")
        .arg(&path)
        .arg("--strict")
        .assert()
        .code(1);
    Ok(())
}

#[test]
fn test_stats_any_policy_override() -> TestResult {
    let dir = TempDir::new()?;
    let path = dir.path().join("t.json");
    write_run_snapshot(&path, None)?;

    // Atomic cases aggregate the same way under both policies.
    checklist()
        .current_dir(dir.path())
        .arg("stats")
        .arg(&path)
        .args(["--aggregation", "any"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Fails (rate):    1 (25.0%)"));
    Ok(())
}

#[test]
fn test_stats_directory() -> TestResult {
    let dir = TempDir::new()?;
    write_run_snapshot(&dir.path().join("a.json"), Some("first"))?;
    write_run_snapshot(&dir.path().join("b.json"), Some("second"))?;

    checklist()
        .current_dir(dir.path())
        .arg("stats")
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("first"))
        .stdout(predicate::str::contains("second"))
        .stdout(predicate::str::contains("Fail Rate"));
    Ok(())
}

#[test]
fn test_stats_empty_directory_warns() -> TestResult {
    let dir = TempDir::new()?;

    checklist()
        .current_dir(dir.path())
        .arg("stats")
        .arg(dir.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("No snapshots found"));
    Ok(())
}

#[test]
fn test_stats_without_results_warns() -> TestResult {
    let dir = TempDir::new()?;
    let path = dir.path().join("fresh.json");
    write_fresh_snapshot(&path)?;

    checklist()
        .current_dir(dir.path())
        .arg("stats")
        .arg(&path)
        .assert()
        .success()
        .stderr(predicate::str::contains("no results"));
    Ok(())
}

#[test]
fn test_stats_missing_file() -> TestResult {
    let dir = TempDir::new()?;

    checklist()
        .current_dir(dir.path())
        .args(["stats", "/nonexistent/snapshot.json"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Failed to load"));
    Ok(())
}

#[test]
fn test_stats_corrupted_snapshot() -> TestResult {
    let dir = TempDir::new()?;
    let path = dir.path().join("t.json");
    write_run_snapshot(&path, None)?;
    let content = std::fs::read_to_string(&path)?.replace("\"awful\"", "\"lovely\"");
    std::fs::write(&path, content)?;

    checklist()
        .current_dir(dir.path())
        .arg("stats")
        .arg(&path)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("data hash mismatch"));
    Ok(())
}
