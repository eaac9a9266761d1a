//! Core data types for checklist.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// An atomic input unit. The engine never looks inside it.
pub type Example = Value;

/// Errors raised while shaping test data.
#[derive(Error, Debug)]
pub enum DataError {
    #[error("unsupported data shape: case {index} is {found} but case 0 is {expected}")]
    MixedShapes {
        index: usize,
        expected: &'static str,
        found: &'static str,
    },
    #[error("{field} has {found} entries but the test has {expected} cases")]
    CaseCount {
        field: &'static str,
        expected: usize,
        found: usize,
    },
}

/// Error for an aggregation policy name that is not known.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown aggregation policy: {0}. Valid policies: all, any")]
pub struct PolicyError(pub String);

/// One entry of test data as supplied by a caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TestCase {
    Atomic(Example),
    Group(Vec<Example>),
}

impl TestCase {
    const fn shape(&self) -> &'static str {
        match self {
            Self::Atomic(_) => "a single example",
            Self::Group(_) => "a group",
        }
    }
}

/// Test data with its shape fixed once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "shape", content = "cases", rename_all = "lowercase")]
pub enum TestData {
    Flat(Vec<Example>),
    Grouped(Vec<Vec<Example>>),
}

impl Default for TestData {
    fn default() -> Self {
        Self::Flat(Vec::new())
    }
}

impl TestData {
    /// Build test data from individually tagged cases.
    ///
    /// The first case decides the shape; an empty list yields flat data.
    ///
    /// # Errors
    /// Returns `DataError::MixedShapes` if atomic cases and groups are mixed.
    pub fn from_cases(cases: Vec<TestCase>) -> Result<Self, DataError> {
        let Some(first) = cases.first() else {
            return Ok(Self::Flat(Vec::new()));
        };
        let expected = first.shape();

        if matches!(first, TestCase::Atomic(_)) {
            let mut flat = Vec::with_capacity(cases.len());
            for (index, case) in cases.into_iter().enumerate() {
                match case {
                    TestCase::Atomic(example) => flat.push(example),
                    other @ TestCase::Group(_) => {
                        return Err(DataError::MixedShapes {
                            index,
                            expected,
                            found: other.shape(),
                        });
                    }
                }
            }
            Ok(Self::Flat(flat))
        } else {
            let mut groups = Vec::with_capacity(cases.len());
            for (index, case) in cases.into_iter().enumerate() {
                match case {
                    TestCase::Group(group) => groups.push(group),
                    other @ TestCase::Atomic(_) => {
                        return Err(DataError::MixedShapes {
                            index,
                            expected,
                            found: other.shape(),
                        });
                    }
                }
            }
            Ok(Self::Grouped(groups))
        }
    }

    /// Number of test cases (original indices).
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Flat(examples) => examples.len(),
            Self::Grouped(groups) => groups.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub const fn is_grouped(&self) -> bool {
        matches!(self, Self::Grouped(_))
    }

    /// Examples belonging to one test case. Empty for an out-of-range index.
    #[must_use]
    pub fn case(&self, index: usize) -> &[Example] {
        match self {
            Self::Flat(examples) => examples
                .get(index)
                .map(std::slice::from_ref)
                .unwrap_or_default(),
            Self::Grouped(groups) => groups.get(index).map(Vec::as_slice).unwrap_or_default(),
        }
    }

    /// Total number of examples across all cases.
    #[must_use]
    pub fn example_count(&self) -> usize {
        match self {
            Self::Flat(examples) => examples.len(),
            Self::Grouped(groups) => groups.iter().map(Vec::len).sum(),
        }
    }
}

/// A predicted label: integer when the token is all digits, text otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Prediction {
    Label(i64),
    Text(String),
}

impl Prediction {
    /// Parse a prediction token.
    #[must_use]
    pub fn parse(token: &str) -> Self {
        if !token.is_empty() && token.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(label) = token.parse() {
                return Self::Label(label);
            }
        }
        Self::Text(token.to_string())
    }

    /// The prediction as a class index, if it is a non-negative integer.
    #[must_use]
    pub fn as_index(&self) -> Option<usize> {
        match self {
            Self::Label(label) => usize::try_from(*label).ok(),
            Self::Text(_) => None,
        }
    }

    /// Whether the prediction equals a JSON label value.
    #[must_use]
    pub fn matches(&self, label: &Value) -> bool {
        match (self, label) {
            (Self::Label(pred), Value::Number(n)) => n.as_i64() == Some(*pred),
            (Self::Text(pred), Value::String(s)) => pred == s,
            _ => false,
        }
    }
}

impl fmt::Display for Prediction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Label(label) => write!(f, "{label}"),
            Self::Text(text) => write!(f, "{text}"),
        }
    }
}

impl From<i64> for Prediction {
    fn from(label: i64) -> Self {
        Self::Label(label)
    }
}

impl From<&str> for Prediction {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

/// Confidence for a prediction: a single score or a probability vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Confidence {
    Scalar(f64),
    Vector(Vec<f64>),
}

impl Confidence {
    /// Confidence of the predicted class.
    ///
    /// Only a probability vector indexed by an integer prediction has one.
    #[must_use]
    pub fn at(&self, pred: &Prediction) -> Option<f64> {
        match self {
            Self::Vector(probs) => pred.as_index().and_then(|i| probs.get(i).copied()),
            Self::Scalar(_) => None,
        }
    }

    /// Whether every value is finite, so it survives a JSON round trip.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        match self {
            Self::Scalar(value) => value.is_finite(),
            Self::Vector(probs) => probs.iter().all(|p| p.is_finite()),
        }
    }
}

impl From<f64> for Confidence {
    fn from(value: f64) -> Self {
        Self::Scalar(value)
    }
}

impl From<Vec<f64>> for Confidence {
    fn from(values: Vec<f64>) -> Self {
        Self::Vector(values)
    }
}

/// Three-state slot for scores and verdicts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", content = "value", rename_all = "lowercase")]
pub enum Slot<T> {
    /// Never executed.
    Unset,
    /// Executed, but the expectation has no opinion.
    Filtered,
    Scored(T),
}

impl<T> Default for Slot<T> {
    fn default() -> Self {
        Self::Unset
    }
}

impl<T> Slot<T> {
    #[must_use]
    pub const fn scored(&self) -> Option<&T> {
        match self {
            Self::Scored(value) => Some(value),
            Self::Unset | Self::Filtered => None,
        }
    }

    #[must_use]
    pub const fn is_filtered(&self) -> bool {
        matches!(self, Self::Filtered)
    }

    #[must_use]
    pub const fn is_unset(&self) -> bool {
        matches!(self, Self::Unset)
    }
}

/// Per-example expectation score. Values above zero pass.
pub type Score = Slot<f64>;

/// Per-case verdict: pass, fail, filtered, or never run.
pub type Verdict = Slot<bool>;

impl Slot<f64> {
    #[must_use]
    pub fn passes(&self) -> bool {
        matches!(self, Self::Scored(v) if *v > 0.0)
    }

    /// Unset, filtered, or a finite score.
    #[must_use]
    pub const fn is_finite(&self) -> bool {
        match self {
            Self::Scored(v) => v.is_finite(),
            Self::Unset | Self::Filtered => true,
        }
    }

    /// A scored value that does not pass. Filtered and unset scores never fail.
    #[must_use]
    pub fn fails(&self) -> bool {
        matches!(self, Self::Scored(_)) && !self.passes()
    }
}

impl Slot<bool> {
    #[must_use]
    pub const fn is_pass(&self) -> bool {
        matches!(self, Self::Scored(true))
    }

    #[must_use]
    pub const fn is_fail(&self) -> bool {
        matches!(self, Self::Scored(false))
    }
}

impl fmt::Display for Slot<bool> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unset => write!(f, "Unset"),
            Self::Filtered => write!(f, "Filtered"),
            Self::Scored(true) => write!(f, "Pass"),
            Self::Scored(false) => write!(f, "Fail"),
        }
    }
}

/// Value stored for one test case: nothing yet, one value, or one per group member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum CaseValue<T> {
    Unset,
    Single(T),
    Group(Vec<T>),
}

impl<T> Default for CaseValue<T> {
    fn default() -> Self {
        Self::Unset
    }
}

impl<T> CaseValue<T> {
    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        match self {
            Self::Unset => &[],
            Self::Single(value) => std::slice::from_ref(value),
            Self::Group(values) => values,
        }
    }

    #[must_use]
    pub const fn is_unset(&self) -> bool {
        matches!(self, Self::Unset)
    }

    /// Append a group member, turning an unset slot into a group.
    pub fn push(&mut self, value: T) {
        match self {
            Self::Group(values) => values.push(value),
            Self::Unset => *self = Self::Group(vec![value]),
            Self::Single(_) => {
                if let Self::Single(first) = std::mem::replace(self, Self::Unset) {
                    *self = Self::Group(vec![first, value]);
                }
            }
        }
    }

    #[must_use]
    pub fn map<U>(&self, mut f: impl FnMut(&T) -> U) -> CaseValue<U> {
        match self {
            Self::Unset => CaseValue::Unset,
            Self::Single(value) => CaseValue::Single(f(value)),
            Self::Group(values) => CaseValue::Group(values.iter().map(f).collect()),
        }
    }
}

/// A value given once for the whole test or once per case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scope", content = "value", rename_all = "lowercase")]
pub enum PerCase<T> {
    Global(T),
    Cases(Vec<T>),
}

impl<T> PerCase<T> {
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&T> {
        match self {
            Self::Global(value) => Some(value),
            Self::Cases(values) => values.get(index),
        }
    }

    /// Check that a per-case list covers every case.
    ///
    /// # Errors
    /// Returns `DataError::CaseCount` on a length mismatch.
    pub fn check_len(&self, field: &'static str, expected: usize) -> Result<(), DataError> {
        match self {
            Self::Cases(values) if values.len() != expected => Err(DataError::CaseCount {
                field,
                expected,
                found: values.len(),
            }),
            _ => Ok(()),
        }
    }
}

/// How per-example scores reduce to a case verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregationPolicy {
    /// Every non-filtered example must pass.
    #[default]
    All,
    /// At least one non-filtered example must pass.
    Any,
}

impl std::str::FromStr for AggregationPolicy {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(Self::All),
            "any" => Ok(Self::Any),
            other => Err(PolicyError(other.to_string())),
        }
    }
}

/// Test type tag carried into summaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestKind {
    /// Minimum functionality test.
    #[default]
    Mft,
    /// Invariance test.
    Inv,
    /// Directional expectation test.
    Dir,
}

impl TestKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Mft => "mft",
            Self::Inv => "inv",
            Self::Dir => "dir",
        }
    }
}

impl fmt::Display for TestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Serializable configuration of a behavioral test.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TestConfig {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub capability: Option<String>,
    #[serde(default)]
    pub kind: TestKind,
    #[serde(default)]
    pub aggregation: AggregationPolicy,
    /// Always show the first example of a case (the anchor of a group).
    #[serde(default)]
    pub print_first: bool,
    #[serde(default)]
    pub labels: Option<PerCase<Value>>,
    #[serde(default)]
    pub meta: Option<PerCase<Value>>,
    /// Templates the cases were generated from. Opaque.
    #[serde(default)]
    pub templates: Option<Value>,
}
