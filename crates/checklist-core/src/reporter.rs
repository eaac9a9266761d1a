//! Console reporter for test runs and summaries.

use crate::stats::TestStats;
use std::io::{self, Write};
use std::path::Path;

/// Reporter configuration.
#[derive(Debug, Clone)]
pub struct ReporterConfig {
    /// Show progress messages.
    pub verbose: bool,
    /// Use colors in output.
    pub color: bool,
}

impl Default for ReporterConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            color: true,
        }
    }
}

/// Writes everything a test run prints.
#[derive(Debug, Clone)]
pub struct Reporter {
    config: ReporterConfig,
}

impl Reporter {
    #[must_use]
    pub const fn new(config: ReporterConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub const fn is_verbose(&self) -> bool {
        self.config.verbose
    }

    /// Announce a prediction call (verbose only).
    pub fn predicting(&self, count: usize) {
        if self.config.verbose {
            println!("Predicting {count} examples");
        }
    }

    /// Print a heading for one test.
    pub fn test_heading(&self, name: &str) {
        if self.config.color {
            println!("\x1b[1m{name}\x1b[0m");
        } else {
            println!("{name}");
        }
    }

    /// Print statistics, highlighting the fail line when anything failed.
    pub fn stats(&self, stats: &TestStats) {
        let text = stats.to_string();
        for line in text.lines() {
            if self.config.color && stats.failed > 0 && line.starts_with("Fails") {
                println!("\x1b[31m{line}\x1b[0m");
            } else {
                println!("{line}");
            }
        }
    }

    /// Print a rendered textual summary.
    pub fn summary_text(&self, text: &str) {
        println!("{text}");
    }

    /// Report a written file (verbose only).
    pub fn saved(&self, path: &Path) {
        if self.config.verbose {
            println!("Saved {}", path.display());
        }
    }

    /// Print a warning message.
    pub fn warn(&self, message: &str) {
        if self.config.color {
            eprintln!("\x1b[33mwarning\x1b[0m: {message}");
        } else {
            eprintln!("warning: {message}");
        }
    }

    /// Print an error message.
    pub fn error(&self, message: &str) {
        if self.config.color {
            eprintln!("\x1b[31merror\x1b[0m: {message}");
        } else {
            eprintln!("error: {message}");
        }
    }

    /// Flush stdout.
    pub fn flush(&self) {
        let _ = io::stdout().flush();
    }
}
