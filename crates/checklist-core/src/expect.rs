//! Expectation scoring and verdict aggregation.
//!
//! An [`Expectation`] turns stored predictions into per-example scores;
//! [`aggregate`] reduces the scores of one case to a verdict.
//!
//! # Aggregation
//! | policy | no non-filtered score | any non-filtered score ≤ 0 | all non-filtered > 0 |
//! |--------|-----------------------|----------------------------|----------------------|
//! | all    | Filtered              | Fail                       | Pass                 |
//! | any    | Filtered              | Pass if one > 0, else Fail | Pass                 |

use crate::results::Results;
use crate::types::{
    AggregationPolicy, CaseValue, Confidence, Example, PerCase, Prediction, Score, TestData,
    Verdict,
};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Read-only view of a test handed to expectations.
#[derive(Debug, Clone, Copy)]
pub struct TestState<'a> {
    pub data: &'a TestData,
    pub results: &'a Results,
    pub labels: Option<&'a PerCase<Value>>,
    pub meta: Option<&'a PerCase<Value>>,
}

impl<'a> TestState<'a> {
    #[must_use]
    pub fn label(&self, index: usize) -> Option<&'a Value> {
        self.labels.and_then(|labels| labels.get(index))
    }

    #[must_use]
    pub fn meta(&self, index: usize) -> Option<&'a Value> {
        self.meta.and_then(|meta| meta.get(index))
    }
}

/// Scores stored predictions, one entry per case.
///
/// Scores above zero pass, scores at or below zero fail, and
/// [`Score::Filtered`] means no opinion. Cases that never ran should be
/// returned as [`CaseValue::Unset`].
pub trait Expectation: Send + Sync {
    fn score(&self, state: &TestState<'_>) -> Vec<CaseValue<Score>>;

    /// Name used to re-attach the expectation after a snapshot is loaded.
    fn name(&self) -> Option<&str> {
        None
    }
}

/// An expectation backed by a function over the whole test.
pub struct FnExpectation<F> {
    name: Option<String>,
    f: F,
}

impl<F> FnExpectation<F> {
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

impl<F> Expectation for FnExpectation<F>
where
    F: Fn(&TestState<'_>) -> Vec<CaseValue<Score>> + Send + Sync,
{
    fn score(&self, state: &TestState<'_>) -> Vec<CaseValue<Score>> {
        (self.f)(state)
    }

    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

/// Wrap a function over the whole test as an expectation.
pub const fn from_fn<F>(f: F) -> FnExpectation<F>
where
    F: Fn(&TestState<'_>) -> Vec<CaseValue<Score>> + Send + Sync,
{
    FnExpectation { name: None, f }
}

/// Everything known about one example when scoring it on its own.
#[derive(Debug, Clone, Copy)]
pub struct ExampleView<'a> {
    pub example: &'a Example,
    pub pred: &'a Prediction,
    pub conf: &'a Confidence,
    pub label: Option<&'a Value>,
    pub meta: Option<&'a Value>,
}

/// Lifts a per-example scoring function over flat and grouped cases.
pub struct PerExample<F> {
    name: Option<String>,
    f: F,
}

impl<F> PerExample<F>
where
    F: Fn(ExampleView<'_>) -> Score + Send + Sync,
{
    pub const fn new(f: F) -> Self {
        Self { name: None, f }
    }

    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

impl<F> Expectation for PerExample<F>
where
    F: Fn(ExampleView<'_>) -> Score + Send + Sync,
{
    fn score(&self, state: &TestState<'_>) -> Vec<CaseValue<Score>> {
        (0..state.data.len())
            .map(|index| {
                let examples = state.data.case(index);
                let label = state.label(index);
                let meta = state.meta(index);
                let score_one = |((example, pred), conf): ((&Example, &Prediction), &Confidence)| {
                    (self.f)(ExampleView {
                        example,
                        pred,
                        conf,
                        label,
                        meta,
                    })
                };
                match (&state.results.preds[index], &state.results.confs[index]) {
                    (CaseValue::Single(pred), CaseValue::Single(conf)) => examples
                        .first()
                        .map_or(CaseValue::Unset, |example| {
                            CaseValue::Single(score_one(((example, pred), conf)))
                        }),
                    (CaseValue::Group(preds), CaseValue::Group(confs)) => CaseValue::Group(
                        examples
                            .iter()
                            .zip(preds)
                            .zip(confs)
                            .map(score_one)
                            .collect(),
                    ),
                    _ => CaseValue::Unset,
                }
            })
            .collect()
    }

    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

/// Name of the built-in label-equality expectation.
pub const EQUALS_LABEL: &str = "equals_label";
/// Name of the built-in group-invariance expectation.
pub const INVARIANT: &str = "invariant";

/// Every prediction must equal its case label. Cases without a label are filtered.
#[must_use]
pub fn equals_label() -> impl Expectation {
    PerExample::new(|view: ExampleView<'_>| match view.label {
        Some(label) if view.pred.matches(label) => Score::Scored(1.0),
        Some(_) => Score::Scored(-1.0),
        None => Score::Filtered,
    })
    .named(EQUALS_LABEL)
}

/// Every member of a group must keep the prediction of its first member.
///
/// The first member is the anchor and is filtered; atomic cases have no
/// opinion either.
#[must_use]
pub fn invariant() -> impl Expectation {
    from_fn(|state: &TestState<'_>| {
        state
            .results
            .preds
            .iter()
            .map(|preds| match preds {
                CaseValue::Unset => CaseValue::Unset,
                CaseValue::Single(_) => CaseValue::Single(Score::Filtered),
                CaseValue::Group(preds) => CaseValue::Group(
                    preds
                        .iter()
                        .enumerate()
                        .map(|(i, pred)| match preds.first() {
                            Some(_) if i == 0 => Score::Filtered,
                            Some(anchor) if anchor == pred => Score::Scored(1.0),
                            _ => Score::Scored(-1.0),
                        })
                        .collect(),
                ),
            })
            .collect()
    })
    .named(INVARIANT)
}

/// Reduce the scores of one case to a verdict.
#[must_use]
pub fn aggregate(scores: &CaseValue<Score>, policy: AggregationPolicy) -> Verdict {
    match scores {
        CaseValue::Unset => Verdict::Unset,
        scored => aggregate_scores(scored.as_slice(), policy),
    }
}

/// Reduce a list of per-example scores to a verdict.
#[must_use]
pub fn aggregate_scores(scores: &[Score], policy: AggregationPolicy) -> Verdict {
    let mut opinions = scores.iter().filter(|s| s.scored().is_some()).peekable();
    if opinions.peek().is_none() {
        return Verdict::Filtered;
    }
    let passed = match policy {
        AggregationPolicy::All => opinions.all(Score::passes),
        AggregationPolicy::Any => opinions.any(Score::passes),
    };
    Verdict::Scored(passed)
}

/// Aggregate every case.
#[must_use]
pub fn aggregate_all(results: &[CaseValue<Score>], policy: AggregationPolicy) -> Vec<Verdict> {
    results.iter().map(|scores| aggregate(scores, policy)).collect()
}

/// Expectations addressable by name.
#[derive(Clone, Default)]
pub struct ExpectationRegistry {
    entries: BTreeMap<String, Arc<dyn Expectation>>,
}

impl ExpectationRegistry {
    /// Registry with the built-in expectations.
    #[must_use]
    pub fn builtin() -> Self {
        let mut registry = Self::default();
        registry.register(EQUALS_LABEL, Arc::new(equals_label()));
        registry.register(INVARIANT, Arc::new(invariant()));
        registry
    }

    /// Register an expectation, replacing any previous one with that name.
    pub fn register(&mut self, name: impl Into<String>, expectation: Arc<dyn Expectation>) {
        self.entries.insert(name.into(), expectation);
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn Expectation>> {
        self.entries.get(name).cloned()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

impl std::fmt::Debug for ExpectationRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.entries.keys()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::ExecutionPlan;
    use crate::predictor::Predictions;
    use serde_json::json;

    fn s(values: &[Option<f64>]) -> Vec<Score> {
        values
            .iter()
            .map(|v| v.map_or(Score::Filtered, Score::Scored))
            .collect()
    }

    #[test]
    fn test_all_pass() {
        let verdict = aggregate_scores(&s(&[Some(1.0), Some(0.5), None]), AggregationPolicy::All);
        assert_eq!(verdict, Verdict::Scored(true));
    }

    #[test]
    fn test_all_fail_on_any_non_positive() {
        let verdict = aggregate_scores(&s(&[Some(1.0), Some(0.0)]), AggregationPolicy::All);
        assert_eq!(verdict, Verdict::Scored(false));
    }

    #[test]
    fn test_all_filtered_iff_everything_filtered() {
        assert_eq!(
            aggregate_scores(&s(&[None, None]), AggregationPolicy::All),
            Verdict::Filtered
        );
        assert_eq!(
            aggregate_scores(&s(&[None, Some(-1.0)]), AggregationPolicy::All),
            Verdict::Scored(false)
        );
        assert_eq!(aggregate_scores(&[], AggregationPolicy::All), Verdict::Filtered);
    }

    #[test]
    fn test_any_pass_with_one_passing() {
        let verdict = aggregate_scores(&s(&[Some(-1.0), Some(2.0)]), AggregationPolicy::Any);
        assert_eq!(verdict, Verdict::Scored(true));
    }

    #[test]
    fn test_any_fail_when_none_pass() {
        let verdict = aggregate_scores(&s(&[Some(-1.0), None, Some(0.0)]), AggregationPolicy::Any);
        assert_eq!(verdict, Verdict::Scored(false));
    }

    #[test]
    fn test_any_filtered() {
        let verdict = aggregate_scores(&s(&[None]), AggregationPolicy::Any);
        assert_eq!(verdict, Verdict::Filtered);
    }

    #[test]
    fn test_unset_case_stays_unset() {
        assert_eq!(
            aggregate(&CaseValue::Unset, AggregationPolicy::All),
            Verdict::Unset
        );
    }

    #[test]
    fn test_aggregate_all_scenario() {
        let scores = vec![
            CaseValue::Single(Score::Scored(1.0)),
            CaseValue::Single(Score::Scored(-1.0)),
            CaseValue::Single(Score::Filtered),
        ];
        assert_eq!(
            aggregate_all(&scores, AggregationPolicy::All),
            vec![Verdict::Scored(true), Verdict::Scored(false), Verdict::Filtered]
        );
    }

    fn run(data: &TestData, preds: Vec<Prediction>) -> Results {
        let plan = ExecutionPlan::build(data, None, None);
        let confs = vec![Confidence::Scalar(1.0); preds.len()];
        let mut results = Results::new(data.len(), &plan);
        results.update_from_predictions(data, &Predictions::new(preds, confs));
        results
    }

    #[test]
    fn test_equals_label() {
        let data = TestData::Flat(vec![json!("a"), json!("b"), json!("c")]);
        let results = run(
            &data,
            vec![Prediction::Label(1), Prediction::Label(0), Prediction::Label(1)],
        );
        let labels = PerCase::Cases(vec![json!(1), json!(1), Value::Null]);
        let state = TestState {
            data: &data,
            results: &results,
            labels: Some(&labels),
            meta: None,
        };
        let scores = equals_label().score(&state);
        assert_eq!(
            scores,
            vec![
                CaseValue::Single(Score::Scored(1.0)),
                CaseValue::Single(Score::Scored(-1.0)),
                CaseValue::Single(Score::Scored(-1.0)),
            ]
        );
    }

    #[test]
    fn test_equals_label_without_labels_is_filtered() {
        let data = TestData::Flat(vec![json!("a")]);
        let results = run(&data, vec![Prediction::Label(1)]);
        let state = TestState {
            data: &data,
            results: &results,
            labels: None,
            meta: None,
        };
        assert_eq!(
            equals_label().score(&state),
            vec![CaseValue::Single(Score::Filtered)]
        );
    }

    #[test]
    fn test_invariant_scores_against_anchor() {
        let data = TestData::Grouped(vec![vec![json!("x"), json!("x'"), json!("x''")]]);
        let results = run(
            &data,
            vec![Prediction::Label(1), Prediction::Label(1), Prediction::Label(0)],
        );
        let state = TestState {
            data: &data,
            results: &results,
            labels: None,
            meta: None,
        };
        let scores = invariant().score(&state);
        assert_eq!(
            scores,
            vec![CaseValue::Group(vec![
                Score::Filtered,
                Score::Scored(1.0),
                Score::Scored(-1.0)
            ])]
        );
        assert_eq!(
            aggregate(&scores[0], AggregationPolicy::All),
            Verdict::Scored(false)
        );
    }

    #[test]
    fn test_from_fn_named() {
        let expectation = from_fn(|state: &TestState<'_>| {
            vec![CaseValue::Single(Score::Scored(1.0)); state.data.len()]
        })
        .named("always");
        assert_eq!(expectation.name(), Some("always"));
    }

    #[test]
    fn test_registry_builtin() {
        let registry = ExpectationRegistry::builtin();
        assert!(registry.get(EQUALS_LABEL).is_some());
        assert!(registry.get(INVARIANT).is_some());
        assert!(registry.get("missing").is_none());
        assert_eq!(registry.names().collect::<Vec<_>>(), vec![EQUALS_LABEL, INVARIANT]);
        assert_eq!(
            registry.get(INVARIANT).and_then(|e| e.name().map(str::to_string)),
            Some(INVARIANT.to_string())
        );
    }
}
