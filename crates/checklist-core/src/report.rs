//! Report generation for test statistics.

use crate::stats::TestStats;
use serde::Serialize;

/// Format for report output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportFormat {
    #[default]
    Table,
    Json,
}

impl std::str::FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(Self::Table),
            "json" => Ok(Self::Json),
            _ => Err(format!("unknown format: {s}. Valid formats: table, json")),
        }
    }
}

/// Statistics of one test, labelled for a multi-test report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsRow {
    /// Test name, or the snapshot file name when the test has none.
    pub name: String,
    pub total: usize,
    pub run: usize,
    pub filtered: usize,
    pub failed: usize,
    pub passed: usize,
    /// Percent of non-filtered run cases that failed.
    pub fail_rate: Option<f64>,
}

impl StatsRow {
    #[must_use]
    pub fn new(name: impl Into<String>, stats: &TestStats) -> Self {
        Self {
            name: name.into(),
            total: stats.total,
            run: stats.run,
            filtered: stats.filtered,
            failed: stats.failed,
            passed: stats.passed,
            fail_rate: stats.fail_rate(),
        }
    }

    /// Fail rate as shown in a table cell.
    #[must_use]
    pub fn fail_rate_cell(&self) -> String {
        self.fail_rate
            .map_or_else(|| "-".to_string(), |rate| format!("{rate:.1}%"))
    }
}

/// Statistics of every test a command inspected.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsReport {
    /// ISO 8601 UTC time the report was made.
    pub timestamp: String,
    pub tests: Vec<StatsRow>,
    /// Tests with at least one failing case.
    pub failing_tests: usize,
}

impl StatsReport {
    #[must_use]
    pub fn new(timestamp: impl Into<String>, tests: Vec<StatsRow>) -> Self {
        let failing_tests = tests.iter().filter(|row| row.failed > 0).count();
        Self {
            timestamp: timestamp.into(),
            tests,
            failing_tests,
        }
    }

    /// Generate the JSON form of the report.
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|e| format!("{{\"error\": \"{e}\"}}"))
    }
}
