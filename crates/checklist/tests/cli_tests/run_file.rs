//! `checklist run-file` tests.

use super::{TestResult, checklist, write_fresh_snapshot, write_run_snapshot};
use checklist_core::{BehaviorTest, ExpectationRegistry};
use predicates::prelude::*;
use tempfile::TempDir;

#[test]
fn test_run_file_pred_and_conf() -> TestResult {
    let dir = TempDir::new()?;
    let path = dir.path().join("t.json");
    let preds = dir.path().join("preds.txt");
    write_fresh_snapshot(&path)?;
    std::fs::write(&preds, "1 0.9\n0 0.8\n0 0.7\n0 0.6\n")?;

    checklist()
        .current_dir(dir.path())
        .arg("run-file")
        .arg(&path)
        .arg(&preds)
        .assert()
        .success()
        .stdout(predicate::str::contains("Fails (rate):    1 (25.0%)"));

    let test = BehaviorTest::load(&path, &ExpectationRegistry::builtin())?;
    assert_eq!(test.fail_idxs()?, vec![2]);
    Ok(())
}

#[test]
fn test_run_file_softmax_with_header() -> TestResult {
    let dir = TempDir::new()?;
    let path = dir.path().join("t.json");
    let preds = dir.path().join("preds.txt");
    write_fresh_snapshot(&path)?;
    std::fs::write(&preds, "pred p0 p1\n1 0.2 0.8\n0 0.9 0.1\n1 0.4 0.6\n0 0.7 0.3\n")?;

    checklist()
        .current_dir(dir.path())
        .arg("run-file")
        .arg(&path)
        .arg(&preds)
        .args(["--pred-format", "pred_and_softmax", "--ignore-header"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Fails (rate):    0 (0.0%)"));
    Ok(())
}

#[test]
fn test_run_file_format_from_config() -> TestResult {
    let dir = TempDir::new()?;
    let path = dir.path().join("t.json");
    let preds = dir.path().join("preds.txt");
    write_fresh_snapshot(&path)?;
    std::fs::write(&preds, "1\n0\n1\n1\n")?;
    std::fs::write(
        dir.path().join("checklist.config.yaml"),
        "pred-format: pred_only\n",
    )?;

    checklist()
        .arg("--config-dir")
        .arg(dir.path())
        .arg("run-file")
        .arg(&path)
        .arg(&preds)
        .assert()
        .success();

    let test = BehaviorTest::load(&path, &ExpectationRegistry::builtin())?;
    assert_eq!(test.fail_idxs()?, vec![3]);
    Ok(())
}

#[test]
fn test_run_file_requires_overwrite() -> TestResult {
    let dir = TempDir::new()?;
    let path = dir.path().join("t.json");
    let preds = dir.path().join("preds.txt");
    write_run_snapshot(&path, None)?;
    std::fs::write(&preds, "1 0.9\n0 0.8\n1 0.7\n0 0.6\n")?;
    let before = std::fs::read_to_string(&path)?;

    checklist()
        .current_dir(dir.path())
        .arg("run-file")
        .arg(&path)
        .arg(&preds)
        .assert()
        .code(3)
        .stderr(predicate::str::contains("results exist"));
    assert_eq!(std::fs::read_to_string(&path)?, before);

    checklist()
        .current_dir(dir.path())
        .arg("run-file")
        .arg(&path)
        .arg(&preds)
        .arg("--overwrite")
        .assert()
        .success()
        .stdout(predicate::str::contains("Fails (rate):    0 (0.0%)"));
    Ok(())
}

#[test]
fn test_run_file_subsample_to_output() -> TestResult {
    let dir = TempDir::new()?;
    let path = dir.path().join("t.json");
    let output = dir.path().join("out.json");
    let preds = dir.path().join("preds.txt");
    write_fresh_snapshot(&path)?;
    std::fs::write(&preds, "1 0.9\n1 0.8\n")?;

    checklist()
        .current_dir(dir.path())
        .arg("run-file")
        .arg(&path)
        .arg(&preds)
        .args(["--subsample", "2", "--seed", "3", "--output"])
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::contains("Test cases run:  2"));

    let original = BehaviorTest::load(&path, &ExpectationRegistry::builtin())?;
    assert!(original.results().is_none());
    let updated = BehaviorTest::load(&output, &ExpectationRegistry::builtin())?;
    assert_eq!(updated.run_idxs().map(<[usize]>::len), Some(2));
    Ok(())
}

#[test]
fn test_run_file_malformed_line() -> TestResult {
    let dir = TempDir::new()?;
    let path = dir.path().join("t.json");
    let preds = dir.path().join("preds.txt");
    write_fresh_snapshot(&path)?;
    std::fs::write(&preds, "1 0.9\n0 high\n1 0.7\n0 0.6\n")?;

    checklist()
        .current_dir(dir.path())
        .arg("run-file")
        .arg(&path)
        .arg(&preds)
        .assert()
        .code(3)
        .stderr(predicate::str::contains("line 2"));
    Ok(())
}

#[test]
fn test_run_file_count_mismatch() -> TestResult {
    let dir = TempDir::new()?;
    let path = dir.path().join("t.json");
    let preds = dir.path().join("preds.txt");
    write_fresh_snapshot(&path)?;
    std::fs::write(&preds, "1 0.9\n")?;

    checklist()
        .current_dir(dir.path())
        .arg("run-file")
        .arg(&path)
        .arg(&preds)
        .assert()
        .code(3)
        .stderr(predicate::str::contains("expected 4 predictions"));
    Ok(())
}

#[test]
fn test_run_file_unknown_format() -> TestResult {
    let dir = TempDir::new()?;
    let path = dir.path().join("t.json");
    let preds = dir.path().join("preds.txt");
    write_fresh_snapshot(&path)?;
    std::fs::write(&preds, "1\n")?;

    checklist()
        .current_dir(dir.path())
        .arg("run-file")
        .arg(&path)
        .arg(&preds)
        .args(["--pred-format", "logits"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("logits"));
    Ok(())
}

#[test]
fn test_run_file_non_finite_confidence() -> TestResult {
    let dir = TempDir::new()?;
    let path = dir.path().join("t.json");
    let preds = dir.path().join("preds.txt");
    write_fresh_snapshot(&path)?;
    std::fs::write(&preds, "1 nan 0.5\n0 0.5 inf\n1 0.4 0.6\n0 0.7 0.3\n")?;
    let before = std::fs::read_to_string(&path)?;

    checklist()
        .current_dir(dir.path())
        .arg("run-file")
        .arg(&path)
        .arg(&preds)
        .args(["--pred-format", "pred_and_softmax"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("not a finite number"));
    assert_eq!(std::fs::read_to_string(&path)?, before);

    let test = BehaviorTest::load(&path, &ExpectationRegistry::builtin())?;
    assert!(test.results().is_none());
    Ok(())
}
