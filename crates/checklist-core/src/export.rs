//! Raw example export, one example per line.

use crate::plan::ExecutionPlan;
use crate::summary::example_text;
use crate::types::{Example, TestData};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur while exporting examples.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Line format of an export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RawFormat {
    /// Plain string form, newlines collapsed to spaces.
    #[default]
    Text,
    /// One JSON record per line.
    Jsonl,
}

impl RawFormat {
    /// Render one example as a single line.
    ///
    /// # Errors
    /// Returns an error if the example cannot be serialized.
    pub fn line(self, example: &Example) -> Result<String, serde_json::Error> {
        match self {
            Self::Text => Ok(example_text(example).replace('\n', " ")),
            Self::Jsonl => serde_json::to_string(example),
        }
    }
}

/// Options for an export.
#[derive(Debug, Clone, Default)]
pub struct ExportOptions {
    pub format: RawFormat,
    /// Line written before the examples.
    pub header: Option<String>,
    pub subsample: Option<usize>,
    pub seed: Option<u64>,
}

/// Lines for the examples of a freshly built plan.
///
/// # Errors
/// Returns an error if an example cannot be serialized.
pub fn raw_examples(
    data: &TestData,
    format: RawFormat,
    subsample: Option<usize>,
    seed: Option<u64>,
) -> Result<Vec<String>, serde_json::Error> {
    let plan = ExecutionPlan::build(data, subsample, seed);
    plan.examples.iter().map(|example| format.line(example)).collect()
}

/// Full export contents: optional header, then one line per example.
///
/// # Errors
/// Returns an error if an example cannot be serialized.
pub fn raw_contents(data: &TestData, options: &ExportOptions) -> Result<String, serde_json::Error> {
    let mut contents = String::new();
    if let Some(header) = &options.header {
        contents.push_str(header.trim_end_matches('\n'));
        contents.push('\n');
    }
    let lines = raw_examples(data, options.format, options.subsample, options.seed)?;
    contents.push_str(&lines.join("\n"));
    Ok(contents)
}

/// Write an export file in one write.
///
/// # Errors
/// Returns an error if serialization or the write fails.
pub fn write_raw_file(
    path: &Path,
    data: &TestData,
    options: &ExportOptions,
) -> Result<(), ExportError> {
    let contents = raw_contents(data, options)?;
    std::fs::write(path, contents)?;
    Ok(())
}
