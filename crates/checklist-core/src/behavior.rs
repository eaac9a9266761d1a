//! Behavioral tests: run predictions, score them, and report on the results.
//!
//! A [`BehaviorTest`] owns its data and configuration, an attached
//! [`Expectation`], and the [`Results`] of its latest run. Every operation that
//! replaces results validates its inputs first, so a failed run leaves the
//! previous results untouched.

use crate::expect::{Expectation, TestState, aggregate_all};
use crate::export::{ExportError, ExportOptions, RawFormat, raw_examples, write_raw_file};
use crate::plan::{ExecutionPlan, seeded_rng};
use crate::predictor::{
    PredFileError, PredFormat, Predictions, Predictor, PredictorError, read_pred_file,
};
use crate::reporter::Reporter;
use crate::results::Results;
use crate::sampling::{CaseView, change_records, select_examples};
use crate::stats::{TestStats, fail_idxs, filtered_idxs};
use crate::summary::{
    CaseSummary, InfoOverrides, InfoStats, Summarizer, SummaryOptions, TestInfo, format_case,
    format_example,
};
use crate::types::{AggregationPolicy, CaseValue, DataError, Score, Slot, TestConfig, TestData, Verdict};
use rand::seq::SliceRandom;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur while running or inspecting a test.
#[derive(Error, Debug)]
pub enum TestError {
    #[error("no results. Run the test first")]
    NoResults,
    #[error("results exist. To overwrite, set overwrite")]
    ResultsExist,
    #[error("expected {expected} predictions, got {preds} predictions and {confs} confidences")]
    PredictionCountMismatch {
        expected: usize,
        preds: usize,
        confs: usize,
    },
    #[error("expectation returned scores for {found} cases, expected {expected}")]
    ScoreCountMismatch { expected: usize, found: usize },
    #[error("prediction {index} has a non-finite confidence")]
    NonFiniteConfidence { index: usize },
    #[error("expectation returned a non-finite score for case {case}")]
    NonFiniteScore { case: usize },
    #[error("predictor failed: {0}")]
    Predictor(#[source] PredictorError),
    #[error("prediction file error: {0}")]
    PredFile(#[from] PredFileError),
    #[error("export error: {0}")]
    Export(#[from] ExportError),
    #[error("data error: {0}")]
    Data(#[from] DataError),
}

/// How a run selects cases and treats existing results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunOptions {
    /// Replace existing results instead of failing.
    pub overwrite: bool,
    /// Run only this many randomly chosen cases.
    pub subsample: Option<usize>,
    pub seed: Option<u64>,
}

/// A behavioral test over a fixed set of cases.
#[derive(Clone)]
pub struct BehaviorTest {
    data: TestData,
    config: TestConfig,
    expectation: Arc<dyn Expectation>,
    results: Option<Results>,
}

impl fmt::Debug for BehaviorTest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BehaviorTest")
            .field("data", &self.data)
            .field("config", &self.config)
            .field("expectation", &self.expectation.name())
            .field("results", &self.results)
            .finish()
    }
}

impl BehaviorTest {
    /// Create a test.
    ///
    /// # Errors
    /// Returns `DataError::CaseCount` if per-case labels or meta do not cover
    /// every case.
    pub fn new(
        data: TestData,
        expectation: Arc<dyn Expectation>,
        config: TestConfig,
    ) -> Result<Self, DataError> {
        if let Some(labels) = &config.labels {
            labels.check_len("labels", data.len())?;
        }
        if let Some(meta) = &config.meta {
            meta.check_len("meta", data.len())?;
        }
        Ok(Self {
            data,
            config,
            expectation,
            results: None,
        })
    }

    /// Reassemble a test with results from an earlier run.
    pub(crate) fn with_results(mut self, results: Option<Results>) -> Self {
        self.results = results;
        self
    }

    #[must_use]
    pub const fn data(&self) -> &TestData {
        &self.data
    }

    #[must_use]
    pub const fn config(&self) -> &TestConfig {
        &self.config
    }

    #[must_use]
    pub fn expectation(&self) -> &dyn Expectation {
        self.expectation.as_ref()
    }

    #[must_use]
    pub const fn results(&self) -> Option<&Results> {
        self.results.as_ref()
    }

    /// Cases selected by the latest run, `None` if it covered every case.
    #[must_use]
    pub fn run_idxs(&self) -> Option<&[usize]> {
        self.results.as_ref().and_then(|r| r.run_idxs.as_deref())
    }

    /// Predict with a live predictor and score the predictions.
    ///
    /// # Errors
    /// Returns `TestError::ResultsExist` before predicting if results exist
    /// and `overwrite` is not set, the predictor's own error, or a
    /// validation error for misaligned predictions.
    pub fn run<P: Predictor + ?Sized>(
        &mut self,
        predictor: &mut P,
        options: &RunOptions,
        reporter: &Reporter,
    ) -> Result<(), TestError> {
        self.check_overwrite(options.overwrite)?;
        let plan = ExecutionPlan::build(&self.data, options.subsample, options.seed);
        reporter.predicting(plan.len());
        let predictions = predictor
            .predict(&plan.examples)
            .map_err(TestError::Predictor)?;
        self.apply(&plan, &predictions)
    }

    /// Score predictions produced elsewhere.
    ///
    /// The plan is rebuilt from `options`, so predictions for a subsampled
    /// export must be run with the same subsample size and seed.
    ///
    /// # Errors
    /// Returns `TestError::ResultsExist` or a validation error.
    pub fn run_from_predictions(
        &mut self,
        predictions: &Predictions,
        options: &RunOptions,
    ) -> Result<(), TestError> {
        self.check_overwrite(options.overwrite)?;
        let plan = ExecutionPlan::build(&self.data, options.subsample, options.seed);
        self.apply(&plan, predictions)
    }

    /// Score predictions read from a file.
    ///
    /// # Errors
    /// Returns `TestError::ResultsExist` before reading the file, any file or
    /// parse error, or a validation error.
    pub fn run_from_file(
        &mut self,
        path: &Path,
        format: PredFormat,
        ignore_header: bool,
        options: &RunOptions,
    ) -> Result<(), TestError> {
        self.check_overwrite(options.overwrite)?;
        let predictions = read_pred_file(path, format, ignore_header)?;
        self.run_from_predictions(&predictions, options)
    }

    fn check_overwrite(&self, overwrite: bool) -> Result<(), TestError> {
        if self.results.is_some() && !overwrite {
            return Err(TestError::ResultsExist);
        }
        Ok(())
    }

    fn apply(&mut self, plan: &ExecutionPlan, predictions: &Predictions) -> Result<(), TestError> {
        if !predictions.is_aligned() || predictions.len() != plan.len() {
            return Err(TestError::PredictionCountMismatch {
                expected: plan.len(),
                preds: predictions.preds.len(),
                confs: predictions.confs.len(),
            });
        }
        if let Some(index) = predictions.confs.iter().position(|c| !c.is_finite()) {
            return Err(TestError::NonFiniteConfidence { index });
        }

        let mut results = Results::new(self.data.len(), plan);
        results.update_from_predictions(&self.data, predictions);
        let (scores, verdicts) = self.evaluate(self.expectation.as_ref(), &results)?;
        results.expect_results = scores;
        results.passed = verdicts;
        self.results = Some(results);
        Ok(())
    }

    fn evaluate(
        &self,
        expectation: &dyn Expectation,
        results: &Results,
    ) -> Result<(Vec<CaseValue<Score>>, Vec<Verdict>), TestError> {
        let state = TestState {
            data: &self.data,
            results,
            labels: self.config.labels.as_ref(),
            meta: self.config.meta.as_ref(),
        };
        let scores = expectation.score(&state);
        if scores.len() != self.data.len() {
            return Err(TestError::ScoreCountMismatch {
                expected: self.data.len(),
                found: scores.len(),
            });
        }
        if let Some(case) = scores
            .iter()
            .position(|score| !score.as_slice().iter().all(Slot::is_finite))
        {
            return Err(TestError::NonFiniteScore { case });
        }
        let verdicts = aggregate_all(&scores, self.config.aggregation);
        Ok((scores, verdicts))
    }

    /// Attach a new expectation and re-score the stored predictions.
    ///
    /// # Errors
    /// Returns `TestError::NoResults` if the test has not run; the previous
    /// expectation stays attached on any error.
    pub fn set_expectation(&mut self, expectation: Arc<dyn Expectation>) -> Result<(), TestError> {
        let results = self.results.as_ref().ok_or(TestError::NoResults)?;
        let (scores, verdicts) = self.evaluate(expectation.as_ref(), results)?;
        self.expectation = expectation;
        self.store_scores(scores, verdicts);
        Ok(())
    }

    /// Re-score the stored predictions with the attached expectation.
    ///
    /// # Errors
    /// Returns `TestError::NoResults` if the test has not run.
    pub fn update_expectation(&mut self) -> Result<(), TestError> {
        let results = self.results.as_ref().ok_or(TestError::NoResults)?;
        let (scores, verdicts) = self.evaluate(self.expectation.as_ref(), results)?;
        self.store_scores(scores, verdicts);
        Ok(())
    }

    /// Change the aggregation policy, re-aggregating stored scores.
    pub fn set_aggregation(&mut self, policy: AggregationPolicy) {
        self.config.aggregation = policy;
        if let Some(results) = &mut self.results {
            results.passed = aggregate_all(&results.expect_results, policy);
        }
    }

    fn store_scores(&mut self, scores: Vec<CaseValue<Score>>, verdicts: Vec<Verdict>) {
        if let Some(results) = &mut self.results {
            results.expect_results = scores;
            results.passed = verdicts;
        }
    }

    fn checked_results(&self) -> Result<&Results, TestError> {
        self.results.as_ref().ok_or(TestError::NoResults)
    }

    /// Indices of failed cases.
    ///
    /// # Errors
    /// Returns `TestError::NoResults` if the test has not run.
    pub fn fail_idxs(&self) -> Result<Vec<usize>, TestError> {
        Ok(fail_idxs(&self.checked_results()?.passed))
    }

    /// Indices of filtered cases.
    ///
    /// # Errors
    /// Returns `TestError::NoResults` if the test has not run.
    pub fn filtered_idxs(&self) -> Result<Vec<usize>, TestError> {
        Ok(filtered_idxs(&self.checked_results()?.passed))
    }

    /// Verdict counts of the latest run.
    ///
    /// # Errors
    /// Returns `TestError::NoResults` if the test has not run.
    pub fn stats(&self) -> Result<TestStats, TestError> {
        let results = self.checked_results()?;
        Ok(TestStats::from_verdicts(
            &results.passed,
            results.run_idxs.as_deref(),
        ))
    }

    /// Print statistics through the reporter.
    ///
    /// # Errors
    /// Returns `TestError::NoResults` if the test has not run.
    pub fn print_stats(&self, reporter: &Reporter) -> Result<(), TestError> {
        reporter.stats(&self.stats()?);
        Ok(())
    }

    fn case_view<'a>(&'a self, index: usize, results: &'a Results) -> CaseView<'a> {
        CaseView {
            examples: self.data.case(index),
            preds: results
                .preds
                .get(index)
                .map(CaseValue::as_slice)
                .unwrap_or_default(),
            confs: results
                .confs
                .get(index)
                .map(CaseValue::as_slice)
                .unwrap_or_default(),
            scores: results
                .expect_results
                .get(index)
                .map(CaseValue::as_slice)
                .unwrap_or_default(),
            label: self.config.labels.as_ref().and_then(|l| l.get(index)),
            meta: self.config.meta.as_ref().and_then(|m| m.get(index)),
        }
    }

    /// Statistics followed by a sample of failing cases.
    ///
    /// Up to `nsamples` failing cases are drawn without replacement using
    /// `seed`; each shows up to `n_per_testcase` of its worst examples.
    ///
    /// # Errors
    /// Returns `TestError::NoResults` if the test has not run.
    pub fn summary_text(&self, options: &SummaryOptions) -> Result<String, TestError> {
        let results = self.checked_results()?;
        let mut out = self.stats()?.to_string();
        let fails = fail_idxs(&results.passed);
        if options.nsamples == 0 || fails.is_empty() {
            return Ok(out);
        }

        out.push_str("\n\nExample fails:");
        let mut rng = seeded_rng(options.seed);
        for &index in fails.choose_multiple(&mut rng, options.nsamples.min(fails.len())) {
            let case = self.case_view(index, results);
            let lines: Vec<String> = select_examples(
                case.scores,
                self.config.print_first,
                options.n_per_testcase,
                true,
            )
            .into_iter()
            .filter_map(|i| {
                Some(format_example(
                    case.examples.get(i)?,
                    case.preds.get(i)?,
                    case.confs.get(i)?,
                ))
            })
            .collect();
            out.push('\n');
            out.push_str(&format_case(&lines, case.preds.len()));
        }
        Ok(out)
    }

    /// Print the textual summary through the reporter.
    ///
    /// # Errors
    /// Returns `TestError::NoResults` if the test has not run.
    pub fn summary(&self, options: &SummaryOptions, reporter: &Reporter) -> Result<(), TestError> {
        reporter.summary_text(&self.summary_text(options)?);
        Ok(())
    }

    /// Test metadata and counts for a visual summary.
    ///
    /// # Errors
    /// Returns `TestError::NoResults` if the test has not run.
    pub fn test_info(&self, overrides: &InfoOverrides) -> Result<TestInfo, TestError> {
        let stats = self.stats()?;
        Ok(TestInfo {
            name: overrides.name.clone().or_else(|| self.config.name.clone()),
            description: overrides
                .description
                .clone()
                .or_else(|| self.config.description.clone()),
            capability: overrides
                .capability
                .clone()
                .or_else(|| self.config.capability.clone()),
            kind: self.config.kind.as_str().to_string(),
            tags: Vec::new(),
            stats: InfoStats {
                nfailed: stats.failed,
                npassed: stats.passed,
                nfiltered: stats.filtered,
            },
        })
    }

    /// Build a visual summary and hand it to `summarizer`.
    ///
    /// Every passed or failed case contributes its change records; cases with
    /// none are left out.
    ///
    /// # Errors
    /// Returns `TestError::NoResults` if the test has not run.
    pub fn visual_summary<S: Summarizer>(
        &self,
        summarizer: &S,
        overrides: &InfoOverrides,
        n_per_testcase: usize,
    ) -> Result<S::Output, TestError> {
        let results = self.checked_results()?;
        let info = self.test_info(overrides)?;
        let cases = results
            .passed
            .iter()
            .enumerate()
            .filter_map(|(index, verdict)| {
                let Slot::Scored(succeed) = verdict else {
                    return None;
                };
                let examples = change_records(
                    &self.case_view(index, results),
                    self.config.print_first,
                    n_per_testcase,
                );
                (!examples.is_empty()).then(|| CaseSummary {
                    examples,
                    succeed: *succeed,
                    tags: Vec::new(),
                })
            })
            .collect();
        Ok(summarizer.summarize(info, cases))
    }

    /// Examples of a freshly built plan, one rendered line each.
    ///
    /// Does not touch the test's results.
    ///
    /// # Errors
    /// Returns an error if an example cannot be serialized.
    pub fn to_raw_examples(
        &self,
        format: RawFormat,
        subsample: Option<usize>,
        seed: Option<u64>,
    ) -> Result<Vec<String>, TestError> {
        raw_examples(&self.data, format, subsample, seed)
            .map_err(|e| TestError::Export(ExportError::Json(e)))
    }

    /// Write the examples of a freshly built plan to a file.
    ///
    /// # Errors
    /// Returns an error if serialization or the write fails.
    pub fn to_raw_file(&self, path: &Path, options: &ExportOptions) -> Result<(), TestError> {
        write_raw_file(path, &self.data, options)?;
        Ok(())
    }
}
