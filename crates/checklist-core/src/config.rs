//! Configuration loader for checklist.

use crate::predictor::PredFormat;
use crate::summary::SummaryOptions;
use crate::types::AggregationPolicy;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// File name looked up in a configuration directory.
pub const CONFIG_FILE: &str = "checklist.config.yaml";

/// Errors that can occur during config loading.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yml::Error),
    #[error("{field} must be at least 1")]
    ZeroSamples { field: &'static str },
}

/// Run and summary defaults shared by every test a command touches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct CheckConfig {
    /// Aggregation policy applied when a snapshot does not fix one (default: all).
    #[serde(default)]
    pub aggregation: Option<AggregationPolicy>,

    /// Failing cases shown in a summary (default: 3).
    #[serde(default = "default_nsamples")]
    pub nsamples: usize,

    /// Examples shown per case (default: 3).
    #[serde(default = "default_nsamples")]
    pub n_per_testcase: usize,

    #[serde(default)]
    pub seed: Option<u64>,

    /// Run only this many randomly chosen cases.
    #[serde(default)]
    pub subsample: Option<usize>,

    /// Prediction file format (default: `pred_and_conf`).
    #[serde(default)]
    pub pred_format: PredFormat,

    /// Skip the first line of prediction files.
    #[serde(default)]
    pub ignore_header: bool,
}

const fn default_nsamples() -> usize {
    3
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            aggregation: None,
            nsamples: default_nsamples(),
            n_per_testcase: default_nsamples(),
            seed: None,
            subsample: None,
            pred_format: PredFormat::default(),
            ignore_header: false,
        }
    }
}

impl CheckConfig {
    #[must_use]
    pub const fn summary_options(&self) -> SummaryOptions {
        SummaryOptions {
            nsamples: self.nsamples,
            n_per_testcase: self.n_per_testcase,
            seed: self.seed,
        }
    }
}

/// Load configuration from `dir`.
///
/// If the file doesn't exist, returns default configuration.
///
/// # Errors
/// Returns an error if:
/// - The file exists but cannot be read
/// - The YAML is invalid or has unknown keys
/// - `nsamples` or `n-per-testcase` is 0
pub fn load_config(dir: &Path) -> Result<CheckConfig, ConfigError> {
    let config_path = dir.join(CONFIG_FILE);

    let config = if config_path.exists() {
        let content = std::fs::read_to_string(&config_path)?;
        serde_yml::from_str(&content)?
    } else {
        CheckConfig::default()
    };

    validate_config(&config)?;
    Ok(config)
}

/// Validate the configuration.
///
/// # Errors
/// Returns `ConfigError::ZeroSamples` for a zero sample count.
pub const fn validate_config(config: &CheckConfig) -> Result<(), ConfigError> {
    if config.nsamples == 0 {
        return Err(ConfigError::ZeroSamples { field: "nsamples" });
    }
    if config.n_per_testcase == 0 {
        return Err(ConfigError::ZeroSamples {
            field: "n-per-testcase",
        });
    }
    Ok(())
}

/// CLI override options for configuration.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub aggregation: Option<AggregationPolicy>,
    pub nsamples: Option<usize>,
    pub n_per_testcase: Option<usize>,
    pub seed: Option<u64>,
    pub subsample: Option<usize>,
    pub pred_format: Option<PredFormat>,
    pub ignore_header: Option<bool>,
}

/// Apply CLI overrides to a configuration.
#[must_use]
pub fn apply_overrides(mut config: CheckConfig, overrides: &ConfigOverrides) -> CheckConfig {
    if let Some(aggregation) = overrides.aggregation {
        config.aggregation = Some(aggregation);
    }
    if let Some(nsamples) = overrides.nsamples {
        config.nsamples = nsamples;
    }
    if let Some(n) = overrides.n_per_testcase {
        config.n_per_testcase = n;
    }
    if let Some(seed) = overrides.seed {
        config.seed = Some(seed);
    }
    if let Some(subsample) = overrides.subsample {
        config.subsample = Some(subsample);
    }
    if let Some(format) = overrides.pred_format {
        config.pred_format = format;
    }
    if let Some(ignore_header) = overrides.ignore_header {
        config.ignore_header = ignore_header;
    }
    config
}
