//! Suite execution: substitution, requests, validation, extraction and reports

pub mod assertions;
pub mod extract;
pub mod report;
pub mod runner;
pub mod suite;
pub mod variables;

pub use assertions::{validate, ArrayMatcher, GreedyMatcher, Validator};
pub use extract::{resolve, PathError};
pub use report::{generate_html_report, generate_report, HtmlReportConfig, ReportConfig, ReportFormat};
pub use runner::{
    format_suite_results, format_suite_results_json, lint_suite, StepPhase, StepRecord, SuiteResult,
    SuiteRunner,
};
pub use suite::{apply_cli_variables, load_suite, TestStep, TestSuite};
pub use variables::{substitute, SubstitutionError, VariableStore};

use std::path::PathBuf;
use std::time::Duration;

use crate::cli::Args;
use crate::client::ReqwestTransport;
use crate::config::Config;
use crate::errors::ChainprobeError;
use crate::output::terminal;
use crate::status::ExitStatus;

/// Load, run and report a suite as described by the command line
pub async fn run_suite(args: &Args, config: &Config) -> Result<ExitStatus, ChainprobeError> {
    let mut suite = load_suite(&args.path)?;
    apply_cli_variables(&mut suite, &args.vars)?;

    let color = terminal::colors_enabled(args.no_color);

    if args.validate {
        return Ok(validate_only(&suite, color));
    }

    let timeout = request_timeout(args.timeout)?;

    if !args.json_output() {
        eprintln!("Running suite: {}", suite.name);
        eprintln!("  Tests: {}", suite.tests.len());
        eprintln!();
    }

    let runner = SuiteRunner::new(ReqwestTransport::new(timeout)?);
    let result = runner.run(&suite).await;

    if args.json_output() {
        print!("{}", format_suite_results_json(&result));
    } else {
        print!("{}", format_suite_results(&result, color));
    }

    generate_suite_reports(args, config, &result)?;

    Ok(ExitStatus::from_run(result.failed()))
}

/// Convert `--timeout` seconds, rejecting values a `Duration` cannot hold
fn request_timeout(secs: Option<f64>) -> Result<Option<Duration>, ChainprobeError> {
    let Some(secs) = secs else {
        return Ok(None);
    };

    match Duration::try_from_secs_f64(secs) {
        Ok(timeout) if !timeout.is_zero() => Ok(Some(timeout)),
        _ => Err(ChainprobeError::Argument(format!(
            "timeout must be a positive number of seconds, got {}",
            secs
        ))),
    }
}

fn validate_only(suite: &TestSuite, color: bool) -> ExitStatus {
    eprintln!("Validating suite: {}", suite.name);
    let warnings = lint_suite(suite);
    if warnings.is_empty() {
        eprintln!("  Suite is valid");
        return ExitStatus::Success;
    }

    let heading = format!("  Suite has {} warning(s):", warnings.len());
    eprintln!("{}", if color { terminal::warning(&heading) } else { heading });
    for warning in &warnings {
        eprintln!("    - {}", warning);
    }
    ExitStatus::Success
}

fn generate_suite_reports(args: &Args, config: &Config, result: &SuiteResult) -> Result<(), ChainprobeError> {
    if !args.no_report {
        let html = HtmlReportConfig {
            output_dir: args
                .output_dir
                .clone()
                .or_else(|| config.report_output_dir.clone())
                .unwrap_or_else(|| PathBuf::from(".")),
            template: args.template.clone(),
        };
        let path = generate_html_report(result, &html)?;
        eprintln!("\nReport generated successfully at: {}", path.display());
    }

    let machine_reports = [
        (&args.report_junit, ReportFormat::JUnit, "JUnit"),
        (&args.report_json, ReportFormat::Json, "JSON"),
        (&args.report_tap, ReportFormat::Tap, "TAP"),
    ];
    for (path, format, label) in machine_reports {
        if let Some(path) = path {
            generate_report(result, &ReportConfig::new(path, format))?;
            eprintln!("{} report written to: {}", label, path.display());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_timeout() {
        assert_eq!(request_timeout(None).unwrap(), None);
        assert_eq!(request_timeout(Some(2.5)).unwrap(), Some(Duration::from_millis(2500)));

        for bad in [0.0, -1.0, f64::NAN, f64::INFINITY, 1e20] {
            assert!(
                matches!(request_timeout(Some(bad)), Err(ChainprobeError::Argument(_))),
                "{} accepted",
                bad
            );
        }
    }
}
