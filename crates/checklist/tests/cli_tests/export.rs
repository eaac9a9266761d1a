//! `checklist export` tests.

use super::{TestResult, checklist, write_fresh_snapshot};
use predicates::prelude::*;
use tempfile::TempDir;

#[test]
fn test_export_text_to_stdout() -> TestResult {
    let dir = TempDir::new()?;
    let path = dir.path().join("t.json");
    write_fresh_snapshot(&path)?;

    checklist()
        .current_dir(dir.path())
        .arg("export")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::eq("good\nbad\nfine\nawful\n"));
    Ok(())
}

#[test]
fn test_export_jsonl_with_header() -> TestResult {
    let dir = TempDir::new()?;
    let path = dir.path().join("t.json");
    write_fresh_snapshot(&path)?;

    checklist()
        .current_dir(dir.path())
        .arg("export")
        .arg(&path)
        .args(["--jsonl", "--header", "text"])
        .assert()
        .success()
        .stdout(predicate::eq("text\n\"good\"\n\"bad\"\n\"fine\"\n\"awful\"\n"));
    Ok(())
}

#[test]
fn test_export_subsample_to_file() -> TestResult {
    let dir = TempDir::new()?;
    let path = dir.path().join("t.json");
    let output = dir.path().join("raw.txt");
    write_fresh_snapshot(&path)?;

    checklist()
        .current_dir(dir.path())
        .arg("export")
        .arg(&path)
        .args(["--subsample", "2", "--seed", "7", "--output"])
        .arg(&output)
        .assert()
        .success();

    let content = std::fs::read_to_string(&output)?;
    assert_eq!(content.lines().count(), 2);
    assert!(
        content
            .lines()
            .all(|line| ["good", "bad", "fine", "awful"].contains(&line))
    );
    Ok(())
}
