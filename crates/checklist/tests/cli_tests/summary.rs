//! `checklist summary` tests.

use super::{TestResult, checklist, write_fresh_snapshot, write_run_snapshot};
use predicates::prelude::*;
use tempfile::TempDir;

#[test]
fn test_summary_text() -> TestResult {
    let dir = TempDir::new()?;
    let path = dir.path().join("t.json");
    write_run_snapshot(&path, None)?;

    checklist()
        .current_dir(dir.path())
        .arg("summary")
        .arg(&path)
        .args(["--seed", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Test cases:      4"))
        .stdout(predicate::str::contains("Example fails:\n0.8 bad\n----"));
    Ok(())
}

#[test]
fn test_summary_zero_samples_rejected() -> TestResult {
    let dir = TempDir::new()?;
    let path = dir.path().join("t.json");
    write_run_snapshot(&path, None)?;

    checklist()
        .current_dir(dir.path())
        .arg("summary")
        .arg(&path)
        .args(["--nsamples", "0"])
        .assert()
        .code(2);
    Ok(())
}

#[test]
fn test_summary_visual() -> TestResult {
    let dir = TempDir::new()?;
    let path = dir.path().join("t.json");
    write_run_snapshot(&path, Some("sentiment"))?;

    let output = checklist()
        .current_dir(dir.path())
        .arg("summary")
        .arg(&path)
        .args(["--visual", "--capability", "Vocabulary"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let summary: serde_json::Value = serde_json::from_slice(&output)?;
    assert_eq!(summary["info"]["name"], "sentiment");
    assert_eq!(summary["info"]["capability"], "Vocabulary");
    assert_eq!(summary["info"]["type"], "mft");
    assert_eq!(summary["info"]["stats"]["nfailed"], 1);
    assert_eq!(summary["info"]["stats"]["npassed"], 3);
    assert_eq!(summary["cases"].as_array().map(Vec::len), Some(4));
    assert_eq!(summary["cases"][1]["succeed"], false);
    assert_eq!(summary["cases"][1]["examples"][0]["new"]["example"], "bad");
    assert_eq!(summary["cases"][1]["examples"][0]["label"], 0);
    Ok(())
}

#[test]
fn test_summary_without_results() -> TestResult {
    let dir = TempDir::new()?;
    let path = dir.path().join("fresh.json");
    write_fresh_snapshot(&path)?;

    checklist()
        .current_dir(dir.path())
        .arg("summary")
        .arg(&path)
        .assert()
        .code(3)
        .stderr(predicate::str::contains("no results"));
    Ok(())
}
