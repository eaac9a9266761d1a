use checklist_core::{
    AggregationPolicy, BehaviorTest, CaseValue, CheckConfig, ConfigOverrides, ExportOptions,
    ExpectationRegistry, InfoOverrides, JsonSummarizer, PredFormat, RawFormat, ReportFormat,
    Reporter, ReporterConfig, RunOptions, Snapshot, SnapshotError, StatsReport, StatsRow,
    TestState, apply_overrides, discover_snapshots, from_fn, load_config, raw_contents,
    validate_config,
};
use clap::{Parser, Subcommand};
use comfy_table::{Cell, Color, Table};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

/// Exit codes for the CLI.
mod exit_code {
    pub const SUCCESS: u8 = 0;
    pub const FAILURES_FOUND: u8 = 1;
    pub const CONFIG_ERROR: u8 = 2;
    pub const EXECUTION_ERROR: u8 = 3;
}

/// Snapshot files picked up when a directory is given.
const SNAPSHOT_PATTERN: &str = "*.json";

#[derive(Parser)]
#[command(name = "checklist")]
#[command(about = "Inspect and run behavioral test snapshots")]
#[command(version)]
struct Cli {
    /// Directory holding checklist.config.yaml
    #[arg(long, global = true, default_value = ".")]
    config_dir: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show statistics for snapshots
    Stats {
        /// Snapshot files or directories containing them
        #[arg(value_name = "SNAPSHOT", required = true)]
        paths: Vec<PathBuf>,

        /// Output format: table, json
        #[arg(long, default_value = "table")]
        format: String,

        /// Aggregation policy: all, any (overrides config)
        #[arg(long)]
        aggregation: Option<String>,

        /// Exit with code 1 when any test has failing cases
        #[arg(long)]
        strict: bool,
    },

    /// Summarize one snapshot with example failures
    Summary {
        #[arg(value_name = "SNAPSHOT")]
        path: PathBuf,

        /// Failing cases to show (overrides config)
        #[arg(long)]
        nsamples: Option<usize>,

        /// Examples per case (overrides config)
        #[arg(long)]
        n_per_testcase: Option<usize>,

        /// Seed for case sampling (overrides config)
        #[arg(long)]
        seed: Option<u64>,

        /// Aggregation policy: all, any (overrides config)
        #[arg(long)]
        aggregation: Option<String>,

        /// Print the visual summary as JSON
        #[arg(long)]
        visual: bool,

        /// Test name shown in the visual summary
        #[arg(long)]
        name: Option<String>,

        /// Test description shown in the visual summary
        #[arg(long)]
        description: Option<String>,

        /// Capability shown in the visual summary
        #[arg(long)]
        capability: Option<String>,
    },

    /// Export the examples of a snapshot, one per line
    Export {
        #[arg(value_name = "SNAPSHOT")]
        path: PathBuf,

        /// Write JSON records instead of plain text
        #[arg(long)]
        jsonl: bool,

        /// Line written before the examples
        #[arg(long)]
        header: Option<String>,

        /// Export only this many randomly chosen cases (overrides config)
        #[arg(long)]
        subsample: Option<usize>,

        /// Seed for subsampling (overrides config)
        #[arg(long)]
        seed: Option<u64>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Score a prediction file and store the results in the snapshot
    RunFile {
        #[arg(value_name = "SNAPSHOT")]
        path: PathBuf,

        #[arg(value_name = "PREDICTIONS")]
        preds: PathBuf,

        /// Prediction format: `pred_only`, `pred_and_conf`, `pred_and_softmax`
        #[arg(long)]
        pred_format: Option<String>,

        /// Skip the first line of the prediction file
        #[arg(long)]
        ignore_header: bool,

        /// Replace existing results
        #[arg(long)]
        overwrite: bool,

        /// Run only this many randomly chosen cases (overrides config)
        #[arg(long)]
        subsample: Option<usize>,

        /// Seed for subsampling (overrides config)
        #[arg(long)]
        seed: Option<u64>,

        /// Write the updated snapshot here instead of in place
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    run_command(&cli)
}

#[allow(clippy::too_many_lines)]
fn run_command(cli: &Cli) -> ExitCode {
    let reporter = Reporter::new(ReporterConfig {
        verbose: cli.verbose,
        color: !cli.no_color,
    });

    let config = match load_config(&cli.config_dir) {
        Ok(c) => c,
        Err(e) => {
            reporter.error(&format!("Failed to load config: {e}"));
            return ExitCode::from(exit_code::CONFIG_ERROR);
        }
    };

    let code = match &cli.command {
        Commands::Stats {
            paths,
            format,
            aggregation,
            strict,
        } => run_stats(&reporter, config, paths, format, aggregation.as_deref(), *strict),
        Commands::Summary {
            path,
            nsamples,
            n_per_testcase,
            seed,
            aggregation,
            visual,
            name,
            description,
            capability,
        } => {
            let aggregation = match parse_aggregation(aggregation.as_deref()) {
                Ok(a) => a,
                Err(e) => {
                    reporter.error(&e);
                    return ExitCode::from(exit_code::CONFIG_ERROR);
                }
            };
            let overrides = ConfigOverrides {
                aggregation,
                nsamples: *nsamples,
                n_per_testcase: *n_per_testcase,
                seed: *seed,
                ..Default::default()
            };
            let info = InfoOverrides {
                name: name.clone(),
                description: description.clone(),
                capability: capability.clone(),
            };
            run_summary(&reporter, config, &overrides, path, *visual, &info)
        }
        Commands::Export {
            path,
            jsonl,
            header,
            subsample,
            seed,
            output,
        } => {
            let config = apply_overrides(
                config,
                &ConfigOverrides {
                    subsample: *subsample,
                    seed: *seed,
                    ..Default::default()
                },
            );
            let options = ExportOptions {
                format: if *jsonl {
                    RawFormat::Jsonl
                } else {
                    RawFormat::Text
                },
                header: header.clone(),
                subsample: config.subsample,
                seed: config.seed,
            };
            run_export(&reporter, path, &options, output.as_deref())
        }
        Commands::RunFile {
            path,
            preds,
            pred_format,
            ignore_header,
            overwrite,
            subsample,
            seed,
            output,
        } => {
            let pred_format = match pred_format.as_deref().map(str::parse::<PredFormat>) {
                None => None,
                Some(Ok(f)) => Some(f),
                Some(Err(e)) => {
                    reporter.error(&format!("Invalid prediction format: {e}"));
                    return ExitCode::from(exit_code::CONFIG_ERROR);
                }
            };
            let config = apply_overrides(
                config,
                &ConfigOverrides {
                    subsample: *subsample,
                    seed: *seed,
                    pred_format,
                    ignore_header: ignore_header.then_some(true),
                    ..Default::default()
                },
            );
            let options = RunOptions {
                overwrite: *overwrite,
                subsample: config.subsample,
                seed: config.seed,
            };
            let output = output.as_deref().unwrap_or(path);
            run_file(&reporter, &config, path, preds, &options, output)
        }
    };

    reporter.flush();
    ExitCode::from(code)
}

fn parse_aggregation(value: Option<&str>) -> Result<Option<AggregationPolicy>, String> {
    value
        .map(str::parse::<AggregationPolicy>)
        .transpose()
        .map_err(|e| format!("Invalid aggregation: {e}"))
}

/// Open a snapshot, re-attaching its expectation when the registry knows it.
///
/// Read-only commands never score, so a snapshot whose expectation is not
/// available still opens for them with an expectation that scores nothing.
fn open_snapshot(
    path: &Path,
    registry: &ExpectationRegistry,
    need_expectation: bool,
) -> Result<BehaviorTest, SnapshotError> {
    let snapshot = Snapshot::read(path)?;
    if need_expectation {
        return snapshot.into_test(registry);
    }
    match snapshot.expectation.as_deref().and_then(|name| registry.get(name)) {
        Some(expectation) => snapshot.into_test_with(expectation),
        None => snapshot.into_test_with(Arc::new(from_fn(|state: &TestState<'_>| {
            vec![CaseValue::Unset; state.data.len()]
        }))),
    }
}

fn resolve_snapshot_paths(paths: &[PathBuf]) -> Result<Vec<PathBuf>, SnapshotError> {
    let mut resolved = Vec::new();
    for path in paths {
        if path.is_dir() {
            resolved.extend(discover_snapshots(path, SNAPSHOT_PATTERN)?);
        } else {
            resolved.push(path.clone());
        }
    }
    Ok(resolved)
}

fn test_name(test: &BehaviorTest, path: &Path) -> String {
    test.config().name.clone().unwrap_or_else(|| {
        path.file_stem()
            .map_or_else(|| path.display().to_string(), |s| s.to_string_lossy().into_owned())
    })
}

fn timestamp() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default()
}

fn run_stats(
    reporter: &Reporter,
    config: CheckConfig,
    paths: &[PathBuf],
    format: &str,
    aggregation: Option<&str>,
    strict: bool,
) -> u8 {
    let report_format: ReportFormat = match format.parse() {
        Ok(f) => f,
        Err(e) => {
            reporter.error(&format!("Invalid format: {e}"));
            return exit_code::CONFIG_ERROR;
        }
    };
    let aggregation = match parse_aggregation(aggregation) {
        Ok(a) => a,
        Err(e) => {
            reporter.error(&e);
            return exit_code::CONFIG_ERROR;
        }
    };
    let config = apply_overrides(
        config,
        &ConfigOverrides {
            aggregation,
            ..Default::default()
        },
    );

    let files = match resolve_snapshot_paths(paths) {
        Ok(f) => f,
        Err(e) => {
            reporter.error(&format!("Failed to resolve snapshot paths: {e}"));
            return exit_code::CONFIG_ERROR;
        }
    };
    if files.is_empty() {
        reporter.warn("No snapshots found");
        return exit_code::SUCCESS;
    }

    let registry = ExpectationRegistry::builtin();
    let mut rows = Vec::with_capacity(files.len());
    for file in &files {
        let mut test = match open_snapshot(file, &registry, false) {
            Ok(t) => t,
            Err(e) => {
                reporter.error(&format!("Failed to load {}: {e}", file.display()));
                return exit_code::CONFIG_ERROR;
            }
        };
        if let Some(policy) = config.aggregation {
            test.set_aggregation(policy);
        }
        let name = test_name(&test, file);
        match test.stats() {
            Ok(stats) => {
                if report_format == ReportFormat::Table {
                    reporter.test_heading(&name);
                    reporter.stats(&stats);
                    println!();
                }
                rows.push(StatsRow::new(name, &stats));
            }
            Err(e) => reporter.warn(&format!("{name}: {e}")),
        }
    }

    let report = StatsReport::new(timestamp(), rows);
    match report_format {
        ReportFormat::Json => println!("{}", report.to_json()),
        ReportFormat::Table => {
            if reporter.is_verbose() || report.tests.len() > 1 {
                print_stats_table(&report.tests);
            }
        }
    }

    if strict && report.failing_tests > 0 {
        exit_code::FAILURES_FOUND
    } else {
        exit_code::SUCCESS
    }
}

fn print_stats_table(rows: &[StatsRow]) {
    let mut table = Table::new();
    table.set_header(vec![
        "Test",
        "Cases",
        "Run",
        "Filtered",
        "Failed",
        "Fail Rate",
    ]);

    for row in rows {
        let failed_cell = if row.failed > 0 {
            Cell::new(row.failed).fg(Color::Red)
        } else {
            Cell::new(row.failed).fg(Color::Green)
        };
        table.add_row(vec![
            Cell::new(&row.name),
            Cell::new(row.total),
            Cell::new(row.run),
            Cell::new(row.filtered),
            failed_cell,
            Cell::new(row.fail_rate_cell()),
        ]);
    }

    println!("{table}");
}

fn run_summary(
    reporter: &Reporter,
    config: CheckConfig,
    overrides: &ConfigOverrides,
    path: &Path,
    visual: bool,
    info: &InfoOverrides,
) -> u8 {
    let config = apply_overrides(config, overrides);
    if let Err(e) = validate_config(&config) {
        reporter.error(&format!("Invalid options: {e}"));
        return exit_code::CONFIG_ERROR;
    }

    let mut test = match open_snapshot(path, &ExpectationRegistry::builtin(), false) {
        Ok(t) => t,
        Err(e) => {
            reporter.error(&format!("Failed to load {}: {e}", path.display()));
            return exit_code::CONFIG_ERROR;
        }
    };
    if let Some(policy) = config.aggregation {
        test.set_aggregation(policy);
    }

    let result = if visual {
        test.visual_summary(&JsonSummarizer, info, config.n_per_testcase)
            .map(|summary| {
                let json = serde_json::to_string_pretty(&summary)
                    .unwrap_or_else(|e| format!("{{\"error\": \"{e}\"}}"));
                println!("{json}");
            })
    } else {
        test.summary(&config.summary_options(), reporter)
    };

    match result {
        Ok(()) => exit_code::SUCCESS,
        Err(e) => {
            reporter.error(&format!("Summary failed: {e}"));
            exit_code::EXECUTION_ERROR
        }
    }
}

fn run_export(
    reporter: &Reporter,
    path: &Path,
    options: &ExportOptions,
    output: Option<&Path>,
) -> u8 {
    let test = match open_snapshot(path, &ExpectationRegistry::builtin(), false) {
        Ok(t) => t,
        Err(e) => {
            reporter.error(&format!("Failed to load {}: {e}", path.display()));
            return exit_code::CONFIG_ERROR;
        }
    };

    let result = match output {
        Some(output) => test.to_raw_file(output, options).map(|()| reporter.saved(output)),
        None => raw_contents(test.data(), options)
            .map(|contents| println!("{contents}"))
            .map_err(|e| checklist_core::TestError::Export(e.into())),
    };

    match result {
        Ok(()) => exit_code::SUCCESS,
        Err(e) => {
            reporter.error(&format!("Export failed: {e}"));
            exit_code::EXECUTION_ERROR
        }
    }
}

fn run_file(
    reporter: &Reporter,
    config: &CheckConfig,
    path: &Path,
    preds: &Path,
    options: &RunOptions,
    output: &Path,
) -> u8 {
    let mut test = match open_snapshot(path, &ExpectationRegistry::builtin(), true) {
        Ok(t) => t,
        Err(e) => {
            reporter.error(&format!("Failed to load {}: {e}", path.display()));
            return exit_code::CONFIG_ERROR;
        }
    };
    if let Some(policy) = config.aggregation {
        test.set_aggregation(policy);
    }

    if let Err(e) = test.run_from_file(preds, config.pred_format, config.ignore_header, options) {
        reporter.error(&format!("Run failed: {e}"));
        return exit_code::EXECUTION_ERROR;
    }
    if let Err(e) = test.save(output) {
        reporter.error(&format!("Failed to save {}: {e}", output.display()));
        return exit_code::EXECUTION_ERROR;
    }
    reporter.saved(output);

    match test.print_stats(reporter) {
        Ok(()) => exit_code::SUCCESS,
        Err(e) => {
            reporter.error(&format!("{e}"));
            exit_code::EXECUTION_ERROR
        }
    }
}
