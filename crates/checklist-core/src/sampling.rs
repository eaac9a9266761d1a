//! Selection of representative examples within one test case.

use crate::types::{Confidence, Example, Prediction, Score};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;

/// Everything stored for one test case, aligned by example position.
#[derive(Debug, Clone, Copy)]
pub struct CaseView<'a> {
    pub examples: &'a [Example],
    pub preds: &'a [Prediction],
    pub confs: &'a [Confidence],
    pub scores: &'a [Score],
    pub label: Option<&'a Value>,
    pub meta: Option<&'a Value>,
}

impl CaseView<'_> {
    /// The example at `index` with its prediction, if it was predicted.
    #[must_use]
    pub fn record(&self, index: usize) -> Option<ExampleRecord> {
        let example = self.examples.get(index)?;
        let pred = self.preds.get(index)?;
        let conf = self.confs.get(index).and_then(|conf| conf.at(pred));
        Some(ExampleRecord {
            example: example.clone(),
            pred: pred.to_string(),
            conf,
        })
    }
}

/// One example as shown in a visual summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExampleRecord {
    pub example: Example,
    pub pred: String,
    /// Confidence of the predicted class, when the confidence is a vector.
    pub conf: Option<f64>,
}

/// A selected example, paired with the case anchor when there is one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeRecord {
    pub new: ExampleRecord,
    pub old: Option<ExampleRecord>,
    pub label: Option<Value>,
    pub succeed: bool,
}

/// Pick up to `nsamples` local example indices to show for a case.
///
/// Indices are ordered by ascending score; equal scores keep their original
/// order and unscored examples come last. With `only_failures`, only scores
/// at or below zero are kept. With `print_first`, index 0 always leads.
#[must_use]
pub fn select_examples(
    scores: &[Score],
    print_first: bool,
    nsamples: usize,
    only_failures: bool,
) -> Vec<usize> {
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| compare_scores(&scores[a], &scores[b]));

    let mut selected: Vec<usize> = order
        .into_iter()
        .filter(|&i| !only_failures || scores[i].fails())
        .collect();

    if print_first && !scores.is_empty() {
        selected.retain(|&i| i != 0);
        selected.insert(0, 0);
    }
    selected.truncate(nsamples);
    selected
}

fn compare_scores(a: &Score, b: &Score) -> Ordering {
    match (a.scored(), b.scored()) {
        (Some(x), Some(y)) => x.total_cmp(y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Change records for a visual summary.
///
/// Selection ignores the failure filter. With `print_first`, the first
/// selected example (index 0) is the anchor reported as `old` for the rest.
#[must_use]
pub fn change_records(case: &CaseView<'_>, print_first: bool, nsamples: usize) -> Vec<ChangeRecord> {
    let selected = select_examples(case.scores, print_first, nsamples, false);
    let (old, shown) = match selected.split_first() {
        Some((&anchor, rest)) if print_first => (case.record(anchor), rest),
        _ => (None, selected.as_slice()),
    };

    shown
        .iter()
        .filter_map(|&index| {
            Some(ChangeRecord {
                new: case.record(index)?,
                old: old.clone(),
                label: case.label.cloned(),
                succeed: case.scores.get(index).is_some_and(Score::passes),
            })
        })
        .collect()
}
