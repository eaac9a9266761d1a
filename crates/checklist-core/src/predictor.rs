//! Prediction sources: live predictors and prediction files.

use crate::types::{Confidence, Example, Prediction};
use serde::{Deserialize, Serialize};
use std::num::ParseFloatError;
use std::path::Path;
use thiserror::Error;

/// Error type returned by live predictors.
pub type PredictorError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur while reading a prediction file.
#[derive(Error, Debug)]
pub enum PredFileError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error(
        "unsupported prediction file format: {0}. Accepted values are pred_only, pred_and_conf, pred_and_softmax"
    )]
    UnknownFormat(String),
    #[error("line {line}: expected {expected}, got '{content}'")]
    MalformedLine {
        line: usize,
        expected: &'static str,
        content: String,
    },
    #[error("line {line}: invalid confidence '{token}': {source}")]
    InvalidConfidence {
        line: usize,
        token: String,
        source: ParseFloatError,
    },
    #[error("line {line}: confidence '{token}' is not a finite number")]
    NonFiniteConfidence { line: usize, token: String },
}

/// Predictions aligned with the flat examples of a plan.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Predictions {
    pub preds: Vec<Prediction>,
    pub confs: Vec<Confidence>,
}

impl Predictions {
    #[must_use]
    pub const fn new(preds: Vec<Prediction>, confs: Vec<Confidence>) -> Self {
        Self { preds, confs }
    }

    pub fn push(&mut self, pred: Prediction, conf: Confidence) {
        self.preds.push(pred);
        self.confs.push(conf);
    }

    /// Number of predictions. Only meaningful when `is_aligned`.
    #[must_use]
    pub fn len(&self) -> usize {
        self.preds.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.preds.is_empty()
    }

    #[must_use]
    pub fn is_aligned(&self) -> bool {
        self.preds.len() == self.confs.len()
    }
}

/// A model (or anything else) that labels examples.
///
/// Called once per run with every planned example; the call may block for as
/// long as the model takes.
pub trait Predictor {
    /// Predict every example, returning one prediction and confidence each.
    ///
    /// # Errors
    /// Any error the underlying model reports. It is passed through unchanged.
    fn predict(&mut self, examples: &[Example]) -> Result<Predictions, PredictorError>;
}

impl<F> Predictor for F
where
    F: FnMut(&[Example]) -> Result<Predictions, PredictorError>,
{
    fn predict(&mut self, examples: &[Example]) -> Result<Predictions, PredictorError> {
        self(examples)
    }
}

/// Line format of a prediction file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredFormat {
    /// `<pred>`; confidence is fixed at 1.0.
    PredOnly,
    /// `<pred> <conf>`
    #[default]
    PredAndConf,
    /// `<pred> <c1> <c2> ...`
    PredAndSoftmax,
}

impl PredFormat {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PredOnly => "pred_only",
            Self::PredAndConf => "pred_and_conf",
            Self::PredAndSoftmax => "pred_and_softmax",
        }
    }

    /// Parse one line into a prediction and its confidence.
    ///
    /// `line_no` is 1-based and only used for error messages.
    ///
    /// # Errors
    /// Returns an error if the line does not have the expected shape or a
    /// confidence is not a float.
    pub fn parse_line(
        self,
        line: &str,
        line_no: usize,
    ) -> Result<(Prediction, Confidence), PredFileError> {
        match self {
            Self::PredOnly => {
                let token = line.trim();
                if token.is_empty() {
                    return Err(malformed(line, line_no, "<pred>"));
                }
                Ok((Prediction::parse(token), Confidence::Scalar(1.0)))
            }
            Self::PredAndConf => {
                let tokens: Vec<&str> = line.split_whitespace().collect();
                let [pred, conf] = tokens.as_slice() else {
                    return Err(malformed(line, line_no, "<pred> <conf>"));
                };
                Ok((
                    Prediction::parse(pred),
                    Confidence::Scalar(parse_float(conf, line_no)?),
                ))
            }
            Self::PredAndSoftmax => {
                let mut tokens = line.split_whitespace();
                let Some(pred) = tokens.next() else {
                    return Err(malformed(line, line_no, "<pred> <c1> <c2> ..."));
                };
                let probs = tokens
                    .map(|token| parse_float(token, line_no))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok((Prediction::parse(pred), Confidence::Vector(probs)))
            }
        }
    }
}

impl std::str::FromStr for PredFormat {
    type Err = PredFileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pred_only" => Ok(Self::PredOnly),
            "pred_and_conf" => Ok(Self::PredAndConf),
            "pred_and_softmax" => Ok(Self::PredAndSoftmax),
            other => Err(PredFileError::UnknownFormat(other.to_string())),
        }
    }
}

impl std::fmt::Display for PredFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn malformed(line: &str, line_no: usize, expected: &'static str) -> PredFileError {
    PredFileError::MalformedLine {
        line: line_no,
        expected,
        content: line.to_string(),
    }
}

fn parse_float(token: &str, line_no: usize) -> Result<f64, PredFileError> {
    let value: f64 = token
        .parse()
        .map_err(|source| PredFileError::InvalidConfidence {
            line: line_no,
            token: token.to_string(),
            source,
        })?;
    if !value.is_finite() {
        return Err(PredFileError::NonFiniteConfidence {
            line: line_no,
            token: token.to_string(),
        });
    }
    Ok(value)
}

/// Parse prediction records from an in-memory buffer, one per line.
///
/// # Errors
/// Returns the first malformed line's error.
pub fn parse_pred_lines(
    content: &str,
    format: PredFormat,
    ignore_header: bool,
) -> Result<Predictions, PredFileError> {
    let skip = usize::from(ignore_header);
    let mut predictions = Predictions::default();
    for (line_no, line) in content.lines().enumerate().skip(skip) {
        let (pred, conf) = format.parse_line(line, line_no + 1)?;
        predictions.push(pred, conf);
    }
    Ok(predictions)
}

/// Read a prediction file in one go.
///
/// # Errors
/// Returns an error if the file cannot be read or a line is malformed.
pub fn read_pred_file(
    path: &Path,
    format: PredFormat,
    ignore_header: bool,
) -> Result<Predictions, PredFileError> {
    let content = std::fs::read_to_string(path)?;
    parse_pred_lines(&content, format, ignore_header)
}
