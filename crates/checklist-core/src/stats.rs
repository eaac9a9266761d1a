//! Verdict statistics and failure extraction.

use crate::types::Verdict;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Case counts for one test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TestStats {
    /// All cases in the test.
    pub total: usize,
    /// Cases that were part of the run.
    pub run: usize,
    pub filtered: usize,
    pub failed: usize,
    pub passed: usize,
}

impl TestStats {
    /// Count verdicts. `run_idxs` is `None` when every case ran.
    #[must_use]
    pub fn from_verdicts(verdicts: &[Verdict], run_idxs: Option<&[usize]>) -> Self {
        let count = |f: fn(&Verdict) -> bool| verdicts.iter().filter(|v| f(v)).count();
        Self {
            total: verdicts.len(),
            run: run_idxs.map_or(verdicts.len(), <[usize]>::len),
            filtered: count(Verdict::is_filtered),
            failed: count(Verdict::is_fail),
            passed: count(Verdict::is_pass),
        }
    }

    /// Run cases the expectation had an opinion on.
    #[must_use]
    pub const fn nonfiltered(&self) -> usize {
        self.run.saturating_sub(self.filtered)
    }

    #[must_use]
    pub const fn is_subsampled(&self) -> bool {
        self.run != self.total
    }

    /// Share of run cases left after filtering, in percent.
    #[must_use]
    pub fn nonfiltered_rate(&self) -> Option<f64> {
        percent(self.nonfiltered(), self.run)
    }

    /// Share of non-filtered run cases that failed, in percent.
    #[must_use]
    pub fn fail_rate(&self) -> Option<f64> {
        percent(self.failed, self.nonfiltered())
    }
}

impl fmt::Display for TestStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Test cases:      {}", self.total)?;
        if self.is_subsampled() {
            write!(f, "\nTest cases run:  {}", self.run)?;
        }
        if self.filtered > 0 {
            if let Some(rate) = self.nonfiltered_rate() {
                write!(f, "\nAfter filtering: {} ({rate:.1}%)", self.nonfiltered())?;
            }
        }
        if let Some(rate) = self.fail_rate() {
            write!(f, "\nFails (rate):    {} ({rate:.1}%)", self.failed)?;
        }
        Ok(())
    }
}

/// Percentage of `part` in `whole`, `None` when `whole` is zero.
#[must_use]
pub fn percent(part: usize, whole: usize) -> Option<f64> {
    if whole == 0 {
        return None;
    }
    let part = f64::from(u32::try_from(part).unwrap_or(u32::MAX));
    let whole = f64::from(u32::try_from(whole).unwrap_or(u32::MAX));
    Some(part / whole * 100.0)
}

/// Indices of failed cases.
#[must_use]
pub fn fail_idxs(verdicts: &[Verdict]) -> Vec<usize> {
    indices_where(verdicts, Verdict::is_fail)
}

/// Indices of filtered cases.
#[must_use]
pub fn filtered_idxs(verdicts: &[Verdict]) -> Vec<usize> {
    indices_where(verdicts, Verdict::is_filtered)
}

fn indices_where(verdicts: &[Verdict], f: fn(&Verdict) -> bool) -> Vec<usize> {
    verdicts
        .iter()
        .enumerate()
        .filter(|(_, v)| f(v))
        .map(|(i, _)| i)
        .collect()
}
