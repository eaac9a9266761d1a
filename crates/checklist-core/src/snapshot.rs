//! Persisted test snapshots.
//!
//! A snapshot stores a test's configuration, data and results as pretty JSON.
//! Expectations are code, so only their name is stored; loading re-attaches
//! one from an [`ExpectationRegistry`] or takes it from the caller.

use crate::behavior::BehaviorTest;
use crate::expect::{Expectation, ExpectationRegistry};
use crate::results::Results;
use crate::types::{DataError, TestConfig, TestData};
use glob::glob;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

/// Current snapshot schema version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Errors that can occur while saving or loading snapshots.
#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("timestamp error: {0}")]
    Timestamp(#[from] time::error::Format),
    #[error("data hash mismatch: stored {stored}, computed {computed}")]
    DataHashMismatch { stored: String, computed: String },
    #[error("unsupported snapshot version {0}. Supported: {SNAPSHOT_VERSION}")]
    UnsupportedVersion(u32),
    #[error("results cover {found} cases but the data has {expected}")]
    ResultsMismatch { expected: usize, found: usize },
    #[error("snapshot does not name an expectation")]
    MissingExpectation,
    #[error("unknown expectation '{0}'")]
    UnknownExpectation(String),
    #[error("glob pattern error: {0}")]
    Glob(#[from] glob::PatternError),
    #[error("data error: {0}")]
    Data(#[from] DataError),
}

/// Serialized form of a [`BehaviorTest`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u32,
    /// ISO 8601 UTC time of the save.
    pub saved_at: String,
    /// Name of the attached expectation, if it has one.
    #[serde(default)]
    pub expectation: Option<String>,
    pub config: TestConfig,
    pub data: TestData,
    #[serde(default)]
    pub results: Option<Results>,
    /// SHA-256 of the JSON form of `data`.
    pub data_hash: String,
}

impl Snapshot {
    /// Capture a test as it is now.
    ///
    /// # Errors
    /// Returns an error if the data cannot be serialized.
    pub fn from_test(test: &BehaviorTest) -> Result<Self, SnapshotError> {
        Ok(Self {
            version: SNAPSHOT_VERSION,
            saved_at: OffsetDateTime::now_utc().format(&Rfc3339)?,
            expectation: test.expectation().name().map(str::to_string),
            config: test.config().clone(),
            data: test.data().clone(),
            results: test.results().cloned(),
            data_hash: compute_data_hash(test.data())?,
        })
    }

    /// Read and verify a snapshot file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed, or fails
    /// verification.
    pub fn read(path: &Path) -> Result<Self, SnapshotError> {
        let content = std::fs::read_to_string(path)?;
        let snapshot: Self = serde_json::from_str(&content)?;
        snapshot.verify()?;
        Ok(snapshot)
    }

    /// Write the snapshot as pretty JSON in one write.
    ///
    /// # Errors
    /// Returns an error if serialization or the write fails.
    pub fn write(&self, path: &Path) -> Result<(), SnapshotError> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Check version, data hash and results shape.
    ///
    /// # Errors
    /// Returns the first failed check.
    pub fn verify(&self) -> Result<(), SnapshotError> {
        if self.version != SNAPSHOT_VERSION {
            return Err(SnapshotError::UnsupportedVersion(self.version));
        }
        let computed = compute_data_hash(&self.data)?;
        if computed != self.data_hash {
            return Err(SnapshotError::DataHashMismatch {
                stored: self.data_hash.clone(),
                computed,
            });
        }
        if let Some(results) = &self.results {
            let lens = [
                results.preds.len(),
                results.confs.len(),
                results.expect_results.len(),
                results.passed.len(),
            ];
            if let Some(&found) = lens.iter().find(|&&n| n != self.data.len()) {
                return Err(SnapshotError::ResultsMismatch {
                    expected: self.data.len(),
                    found,
                });
            }
        }
        Ok(())
    }

    /// Rebuild the test, re-attaching the expectation by name.
    ///
    /// # Errors
    /// Returns an error if the snapshot names no expectation, the registry
    /// does not know it, or the config does not fit the data.
    pub fn into_test(self, registry: &ExpectationRegistry) -> Result<BehaviorTest, SnapshotError> {
        let name = self
            .expectation
            .clone()
            .ok_or(SnapshotError::MissingExpectation)?;
        let expectation = registry
            .get(&name)
            .ok_or(SnapshotError::UnknownExpectation(name))?;
        self.into_test_with(expectation)
    }

    /// Rebuild the test with an explicitly supplied expectation.
    ///
    /// # Errors
    /// Returns an error if the config does not fit the data.
    pub fn into_test_with(
        self,
        expectation: Arc<dyn Expectation>,
    ) -> Result<BehaviorTest, SnapshotError> {
        let test = BehaviorTest::new(self.data, expectation, self.config)?;
        Ok(test.with_results(self.results))
    }
}

impl BehaviorTest {
    /// Save the test to a snapshot file.
    ///
    /// # Errors
    /// Returns an error if serialization or the write fails.
    pub fn save(&self, path: &Path) -> Result<(), SnapshotError> {
        Snapshot::from_test(self)?.write(path)
    }

    /// Load a test from a snapshot file, re-attaching its expectation from
    /// `registry`.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or verified, or the
    /// expectation cannot be re-attached.
    pub fn load(path: &Path, registry: &ExpectationRegistry) -> Result<Self, SnapshotError> {
        Snapshot::read(path)?.into_test(registry)
    }
}

/// SHA-256 hex digest of the JSON form of test data.
///
/// # Errors
/// Returns an error if the data cannot be serialized.
pub fn compute_data_hash(data: &TestData) -> Result<String, SnapshotError> {
    use sha2::{Digest, Sha256};
    use std::fmt::Write;

    let json = serde_json::to_string(data)?;
    let mut hasher = Sha256::new();
    hasher.update(json.as_bytes());
    let result = hasher.finalize();

    Ok(result.iter().fold(String::with_capacity(64), |mut acc, b| {
        let _ = write!(acc, "{b:02x}");
        acc
    }))
}

/// Find snapshot files under `dir` matching a glob pattern.
///
/// Returns sorted paths of regular files.
///
/// # Errors
/// Returns an error if the pattern is invalid.
pub fn discover_snapshots(dir: &Path, pattern: &str) -> Result<Vec<PathBuf>, SnapshotError> {
    let full_pattern = dir.join(pattern);
    let mut files: Vec<PathBuf> = glob(&full_pattern.to_string_lossy())?
        .flatten()
        .filter(|path| path.is_file())
        .collect();
    files.sort();
    Ok(files)
}
