//! Summaries handed to renderers, and the default textual example format.

use crate::sampling::ChangeRecord;
use crate::types::{Confidence, Example, Prediction};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// Pass/fail/filtered counts reported with a summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InfoStats {
    pub nfailed: usize,
    pub npassed: usize,
    pub nfiltered: usize,
}

/// Test metadata for a visual summary.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TestInfo {
    pub name: Option<String>,
    pub description: Option<String>,
    pub capability: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
    pub tags: Vec<String>,
    pub stats: InfoStats,
}

/// Per-call replacements for the test's own metadata.
#[derive(Debug, Clone, Default)]
pub struct InfoOverrides {
    pub name: Option<String>,
    pub description: Option<String>,
    pub capability: Option<String>,
}

/// Examples chosen for one test case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseSummary {
    pub examples: Vec<ChangeRecord>,
    pub succeed: bool,
    pub tags: Vec<String>,
}

/// Renders a visual summary.
pub trait Summarizer {
    type Output;

    fn summarize(&self, info: TestInfo, cases: Vec<CaseSummary>) -> Self::Output;
}

/// A visual summary as one serializable document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualSummary {
    pub info: TestInfo,
    pub cases: Vec<CaseSummary>,
}

/// Summarizer that keeps the summary as data for JSON output.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSummarizer;

impl Summarizer for JsonSummarizer {
    type Output = VisualSummary;

    fn summarize(&self, info: TestInfo, cases: Vec<CaseSummary>) -> Self::Output {
        VisualSummary { info, cases }
    }
}

/// Options for the textual summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SummaryOptions {
    /// Failing cases to show.
    pub nsamples: usize,
    /// Examples to show per failing case.
    pub n_per_testcase: usize,
    pub seed: Option<u64>,
}

impl Default for SummaryOptions {
    fn default() -> Self {
        Self {
            nsamples: 3,
            n_per_testcase: 3,
            seed: None,
        }
    }
}

/// Plain string form of an example.
#[must_use]
pub fn example_text(example: &Example) -> String {
    match example {
        Example::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Default one-line rendering of a predicted example.
#[must_use]
pub fn format_example(example: &Example, pred: &Prediction, conf: &Confidence) -> String {
    let text = example_text(example);
    match conf {
        Confidence::Vector(probs) if probs.len() == 2 => format!("{:.1} {text}", probs[1]),
        Confidence::Vector(probs) if probs.len() <= 4 => {
            let probs: Vec<String> = probs.iter().map(|p| format!("{p:.1}")).collect();
            format!("{} {text}", probs.join(" "))
        }
        Confidence::Vector(_) => conf.at(pred).map_or_else(
            || format!("{pred} {text}"),
            |p| format!("{pred} ({p:.1}) {text}"),
        ),
        Confidence::Scalar(p) => format!("{pred} ({p:.1}) {text}"),
    }
}

/// Render the selected examples of one case, followed by the case separator.
///
/// Cases with more than one prediction get a blank line before the separator,
/// however many of their examples were selected.
#[must_use]
pub fn format_case(lines: &[String], case_size: usize) -> String {
    let mut out = String::new();
    for line in lines {
        let _ = writeln!(out, "{line}");
    }
    if case_size > 1 {
        out.push('\n');
    }
    out.push_str("----");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_format_example_binary_softmax() {
        let line = format_example(
            &json!("great movie"),
            &Prediction::Label(1),
            &Confidence::Vector(vec![0.2, 0.8]),
        );
        assert_eq!(line, "0.8 great movie");
    }

    #[test]
    fn test_format_example_small_softmax() {
        let line = format_example(
            &json!("ok"),
            &Prediction::Label(0),
            &Confidence::Vector(vec![0.5, 0.3, 0.2]),
        );
        assert_eq!(line, "0.5 0.3 0.2 ok");
    }

    #[test]
    fn test_format_example_large_softmax() {
        let line = format_example(
            &json!("x"),
            &Prediction::Label(4),
            &Confidence::Vector(vec![0.0, 0.1, 0.1, 0.1, 0.7]),
        );
        assert_eq!(line, "4 (0.7) x");
    }

    #[test]
    fn test_format_example_scalar() {
        let line = format_example(
            &json!({"q": "who?"}),
            &Prediction::Text("alice".into()),
            &Confidence::Scalar(1.0),
        );
        assert_eq!(line, r#"alice (1.0) {"q":"who?"}"#);
    }

    #[test]
    fn test_format_case_blank_line_follows_case_size() {
        let lines = vec!["a".to_string(), "b".to_string()];
        assert_eq!(format_case(&lines, 2), "a\nb\n\n----");
        assert_eq!(format_case(&lines[..1], 3), "a\n\n----");
        assert_eq!(format_case(&lines[..1], 1), "a\n----");
    }

    #[test]
    fn test_test_info_serializes_type_tag() -> Result<(), serde_json::Error> {
        let info = TestInfo {
            kind: "inv".to_string(),
            ..TestInfo::default()
        };
        let json = serde_json::to_value(&info)?;
        assert_eq!(json["type"], "inv");
        assert_eq!(json["stats"]["nfailed"], 0);
        Ok(())
    }
}
