//! CLI argument definitions using clap

use clap::{ArgAction, Parser, ValueEnum};
use std::path::PathBuf;

/// chainprobe - run declarative HTTP test suites with values chained between steps
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "chainprobe", version, about, long_about = None)]
pub struct Args {
    /// Suite file to run (JSON, YAML or TOML)
    #[arg(value_name = "SUITE", default_value = "./test.json")]
    pub path: PathBuf,

    /// Set a suite variable (NAME=VALUE, can be used multiple times)
    #[arg(long = "var", value_name = "NAME=VALUE", action = ArgAction::Append)]
    pub vars: Vec<String>,

    /// Check the suite for undefined variables without sending requests
    #[arg(long = "validate", action = ArgAction::SetTrue)]
    pub validate: bool,

    /// Per-request timeout in seconds
    #[arg(long = "timeout", value_name = "SECONDS")]
    pub timeout: Option<f64>,

    // =========================================================================
    // REPORTS
    // =========================================================================

    /// Directory for the HTML report (default: config value or current directory)
    #[arg(long = "output-dir", value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Tera template used instead of the built-in HTML report
    #[arg(long = "template", value_name = "FILE")]
    pub template: Option<PathBuf>,

    /// Do not write the HTML report
    #[arg(long = "no-report", action = ArgAction::SetTrue)]
    pub no_report: bool,

    /// Generate JUnit XML report (for CI/CD integration)
    #[arg(long = "report-junit", value_name = "FILE")]
    pub report_junit: Option<PathBuf>,

    /// Generate JSON report
    #[arg(long = "report-json", value_name = "FILE")]
    pub report_json: Option<PathBuf>,

    /// Generate TAP (Test Anything Protocol) report
    #[arg(long = "report-tap", value_name = "FILE")]
    pub report_tap: Option<PathBuf>,

    // =========================================================================
    // OUTPUT & TROUBLESHOOTING
    // =========================================================================

    /// Force disable colors in output
    #[arg(long = "no-color", action = ArgAction::SetTrue)]
    pub no_color: bool,

    /// Output format for results and logs: json (JSON Lines) or text (default)
    #[arg(long = "log-format", value_name = "FORMAT", value_enum)]
    pub log_format: Option<LogFormat>,

    /// Verbose logging. Use -vv for even more verbose
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbose: u8,

    /// Show traceback on error
    #[arg(long = "traceback", action = ArgAction::SetTrue)]
    pub traceback: bool,

    /// Debug mode (implies --traceback)
    #[arg(long = "debug", action = ArgAction::SetTrue)]
    pub debug: bool,
}

/// Output format for structured logging
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Plain text output (default)
    #[default]
    Text,
    /// JSON Lines format for parsing
    Json,
}

impl Args {
    /// Tracing filter directive implied by `-v`/`--debug`
    pub fn log_level(&self) -> &'static str {
        match (self.debug, self.verbose) {
            (true, _) => "debug",
            (false, 0) => "warn",
            (false, 1) => "info",
            (false, 2) => "debug",
            _ => "trace",
        }
    }

    pub fn json_output(&self) -> bool {
        matches!(self.log_format, Some(LogFormat::Json))
    }
}
