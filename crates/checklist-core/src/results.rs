//! Per-case storage of predictions, scores and verdicts.

use crate::plan::ExecutionPlan;
use crate::predictor::Predictions;
use crate::types::{CaseValue, Confidence, Prediction, Score, TestData, Verdict};
use serde::{Deserialize, Serialize};

/// Results of one run, indexed by original case index.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Results {
    pub preds: Vec<CaseValue<Prediction>>,
    pub confs: Vec<CaseValue<Confidence>>,
    pub expect_results: Vec<CaseValue<Score>>,
    pub passed: Vec<Verdict>,
    /// Selected case indices, `None` when every case ran.
    #[serde(default)]
    pub run_idxs: Option<Vec<usize>>,
    /// Owning case of each prediction, in prediction order.
    pub result_indexes: Vec<usize>,
}

impl Results {
    /// Empty results for a plan over `case_count` cases.
    #[must_use]
    pub fn new(case_count: usize, plan: &ExecutionPlan) -> Self {
        Self {
            preds: vec![CaseValue::Unset; case_count],
            confs: vec![CaseValue::Unset; case_count],
            expect_results: vec![CaseValue::Unset; case_count],
            passed: vec![Verdict::Unset; case_count],
            run_idxs: plan.run_idxs.clone(),
            result_indexes: plan.result_indexes.clone(),
        }
    }

    /// Scatter flat predictions back to their cases.
    ///
    /// Grouped data collects one entry per group member in arrival order; flat
    /// data stores a single value. Cases outside the plan stay unset. Prediction
    /// state is rebuilt from scratch, so repeating the call is harmless.
    pub fn update_from_predictions(&mut self, data: &TestData, predictions: &Predictions) {
        let case_count = data.len();
        let mut preds = vec![CaseValue::Unset; case_count];
        let mut confs = vec![CaseValue::Unset; case_count];

        if data.is_grouped() {
            let selected = self
                .run_idxs
                .clone()
                .unwrap_or_else(|| (0..case_count).collect());
            for index in selected {
                preds[index] = CaseValue::Group(Vec::new());
                confs[index] = CaseValue::Group(Vec::new());
            }
        }

        let triples = self
            .result_indexes
            .iter()
            .zip(&predictions.preds)
            .zip(&predictions.confs);
        for ((&index, pred), conf) in triples {
            if index >= case_count {
                continue;
            }
            if data.is_grouped() {
                preds[index].push(pred.clone());
                confs[index].push(conf.clone());
            } else {
                preds[index] = CaseValue::Single(pred.clone());
                confs[index] = CaseValue::Single(conf.clone());
            }
        }

        self.preds = preds;
        self.confs = confs;
    }

    /// Number of cases these results cover.
    #[must_use]
    pub fn len(&self) -> usize {
        self.passed.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.passed.is_empty()
    }

    /// Number of cases that were part of the run.
    #[must_use]
    pub fn run_count(&self) -> usize {
        self.run_idxs.as_ref().map_or(self.len(), Vec::len)
    }
}
