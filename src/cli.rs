//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use chrono::{Datelike, Utc};
use clap::Parser;
use std::path::PathBuf;

/// First year with bills available in the open-data API.
pub const FIRST_YEAR: i32 = 1991;

/// plscope - bill statistics from the Chamber of Deputies open-data API
///
/// Collects every PL presented in a year range, counts them per month and
/// per party of their parliamentary authors, and writes a Markdown or JSON
/// report.
///
/// Examples:
///   plscope --start-year 2023 --end-year 2024
///   plscope --start-year 2019 --all --format json -o report.json
///   plscope --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// First year of the period (inclusive)
    #[arg(long, default_value_t = 2019, value_name = "YEAR")]
    pub start_year: i32,

    /// Last year of the period (inclusive); defaults to the current year
    #[arg(long, value_name = "YEAR")]
    pub end_year: Option<i32>,

    /// Resolve parties for ALL collected bills (slow, more complete)
    ///
    /// Without this flag only the first bills of the period are used for
    /// the per-party chart.
    #[arg(short, long)]
    pub all: bool,

    /// Output file path for the report
    #[arg(
        short,
        long,
        default_value = "plscope_report.md",
        value_name = "FILE"
    )]
    pub output: PathBuf,

    /// Output format (markdown, json)
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Path to configuration file
    ///
    /// If not specified, looks for .plscope.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Base URL of the open-data API
    #[arg(long, value_name = "URL", env = "PLSCOPE_API_URL")]
    pub api_url: Option<String>,

    /// Request timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Rows shown in the sample table of the report
    #[arg(long, value_name = "ROWS")]
    pub preview_rows: Option<usize>,

    /// Bills used for the per-party chart when --all is not set
    #[arg(long, value_name = "COUNT")]
    pub sample_limit: Option<usize>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .plscope.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Last year of the period, falling back to the current year.
    pub fn effective_end_year(&self) -> i32 {
        self.end_year.unwrap_or_else(current_year)
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        let end_year = self.effective_end_year();
        let this_year = current_year();

        if self.start_year < FIRST_YEAR {
            return Err(format!("Start year must be {} or later", FIRST_YEAR));
        }

        if end_year > this_year {
            return Err(format!("End year cannot be after {}", this_year));
        }

        if self.start_year > end_year {
            return Err(format!(
                "Start year ({}) must not be after end year ({})",
                self.start_year, end_year
            ));
        }

        if let Some(ref url) = self.api_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err("API URL must start with 'http://' or 'https://'".to_string());
            }
        }

        if let Some(timeout) = self.timeout {
            if timeout == 0 {
                return Err("Timeout must be at least 1 second".to_string());
            }
        }

        if self.sample_limit == Some(0) {
            return Err("Sample limit must be at least 1".to_string());
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

fn current_year() -> i32 {
    Utc::now().year()
}
