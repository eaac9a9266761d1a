//! Core library for the checklist CLI.
//!
//! This crate runs behavioral tests against a model and aggregates the results:
//! - Execution planning over flat or grouped examples, with seeded subsampling
//! - Predictions from a live predictor or a prediction file
//! - Expectation scoring and all/any verdict aggregation
//! - Statistics, failure extraction and example sampling for summaries
//! - Raw example export and JSON snapshots of a test

pub mod behavior;
pub mod config;
pub mod expect;
pub mod export;
pub mod plan;
pub mod predictor;
pub mod report;
pub mod reporter;
pub mod results;
pub mod sampling;
pub mod snapshot;
pub mod stats;
pub mod summary;
pub mod types;

pub use behavior::{BehaviorTest, RunOptions, TestError};
pub use config::{
    CONFIG_FILE, CheckConfig, ConfigError, ConfigOverrides, apply_overrides, load_config,
    validate_config,
};
pub use expect::{
    EQUALS_LABEL, ExampleView, Expectation, ExpectationRegistry, FnExpectation, INVARIANT,
    PerExample, TestState, aggregate, aggregate_all, aggregate_scores, equals_label, from_fn,
    invariant,
};
pub use export::{
    ExportError, ExportOptions, RawFormat, raw_contents, raw_examples, write_raw_file,
};
pub use plan::{ExecutionPlan, sample_indices, seeded_rng};
pub use predictor::{
    PredFileError, PredFormat, Predictions, Predictor, PredictorError, parse_pred_lines,
    read_pred_file,
};
pub use report::{ReportFormat, StatsReport, StatsRow};
pub use reporter::{Reporter, ReporterConfig};
pub use results::Results;
pub use sampling::{CaseView, ChangeRecord, ExampleRecord, change_records, select_examples};
pub use snapshot::{
    SNAPSHOT_VERSION, Snapshot, SnapshotError, compute_data_hash, discover_snapshots,
};
pub use stats::{TestStats, fail_idxs, filtered_idxs, percent};
pub use summary::{
    CaseSummary, InfoOverrides, InfoStats, JsonSummarizer, Summarizer, SummaryOptions, TestInfo,
    VisualSummary, example_text, format_case, format_example,
};
pub use types::*;
