//! Report generation for suite results
//!
//! The HTML report is rendered with Tera, from the built-in template or a
//! user supplied one. JUnit XML, JSON and TAP reports are written for CI.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use junit_report::{Duration, Report, TestCase, TestSuite};
use serde::Serialize;
use serde_json::Value as JsonValue;
use tera::{Context, Tera};
use time::OffsetDateTime;
use tracing::info;

use super::runner::{StepRecord, SuiteResult};
use crate::errors::ChainprobeError;

const BUILTIN_TEMPLATE: &str = include_str!("templates/report.html");
const TEMPLATE_NAME: &str = "report.html";

/// Report format options for machine readable reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    /// JUnit XML format (for CI/CD systems)
    JUnit,
    /// JSON format
    Json,
    /// TAP (Test Anything Protocol) format
    Tap,
}

/// Configuration for a machine readable report
#[derive(Debug, Clone)]
pub struct ReportConfig {
    /// Output file path
    pub output_path: PathBuf,
    pub format: ReportFormat,
    /// Include request details in failure messages
    pub include_response_details: bool,
}

impl ReportConfig {
    pub fn new(output_path: impl Into<PathBuf>, format: ReportFormat) -> Self {
        Self {
            output_path: output_path.into(),
            format,
            include_response_details: true,
        }
    }
}

/// Configuration for the HTML report
#[derive(Debug, Clone)]
pub struct HtmlReportConfig {
    /// Directory the report file is written into; created when missing
    pub output_dir: PathBuf,
    /// Template file replacing the built-in one
    pub template: Option<PathBuf>,
}

impl Default for HtmlReportConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            template: None,
        }
    }
}

/// Data handed to the HTML template
#[derive(Debug, Serialize)]
pub struct ReportData {
    pub title: String,
    pub generated_at: String,
    pub pass_count: usize,
    pub fail_count: usize,
    pub total_count: usize,
    pub success_rate: usize,
    pub total_time: String,
    pub records: Vec<ReportRecord>,
}

/// One step as seen by the template
#[derive(Debug, Serialize)]
pub struct ReportRecord {
    pub number: usize,
    pub name: String,
    pub method: String,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<JsonValue>,
    pub expected_status: String,
    /// Empty when no response was received
    pub actual_status: String,
    pub expected_response: Option<JsonValue>,
    pub actual_response: Option<String>,
    pub passed: bool,
    pub error: Option<String>,
    pub logs: Vec<String>,
    pub extracted: Vec<(String, JsonValue)>,
    pub response_time_ms: u128,
}

impl ReportData {
    pub fn from_result(result: &SuiteResult) -> Self {
        Self {
            title: result.name.clone(),
            generated_at: chrono::Local::now().format("%d-%m-%Y %H:%M:%S").to_string(),
            pass_count: result.passed(),
            fail_count: result.failed(),
            total_count: result.total(),
            success_rate: result.success_rate(),
            total_time: humantime::format_duration(std::time::Duration::from_millis(
                result.total_time.as_millis() as u64,
            ))
            .to_string(),
            records: result.records.iter().map(ReportRecord::from_record).collect(),
        }
    }
}

impl ReportRecord {
    fn from_record(record: &StepRecord) -> Self {
        Self {
            number: record.number,
            name: record.name.clone(),
            method: record.method.clone(),
            url: record.url.clone(),
            headers: record.headers.clone(),
            body: record.body.clone(),
            expected_status: record.expected_status.clone(),
            actual_status: record.actual_status.clone().unwrap_or_default(),
            expected_response: record.expected_response.clone(),
            actual_response: record.actual_response.clone(),
            passed: record.passed(),
            error: record.error.clone(),
            logs: record.logs.clone(),
            extracted: record.extracted.clone(),
            response_time_ms: record.response_time.as_millis(),
        }
    }
}

/// File name for an HTML report: spaces in the suite name become underscores
pub fn html_report_file_name(suite_name: &str, now: chrono::DateTime<chrono::Local>) -> String {
    format!("{}_{}.html", suite_name.replace(' ', "_"), now.format("%d-%m_%H.%M"))
}

/// Render the HTML report to a string
pub fn render_html_report(result: &SuiteResult, template: Option<&Path>) -> Result<String, ChainprobeError> {
    let source = match template {
        Some(path) => fs::read_to_string(path).map_err(|e| {
            ChainprobeError::Report(format!("cannot read template {}: {}", path.display(), e))
        })?,
        None => BUILTIN_TEMPLATE.to_string(),
    };

    let mut tera = Tera::default();
    tera.add_raw_template(TEMPLATE_NAME, &source)
        .map_err(|e| ChainprobeError::Report(format!("cannot parse template: {}", tera_error_chain(&e))))?;
    tera.register_filter("pretty_json", pretty_json);
    tera.register_filter("method_color", method_color);
    tera.register_filter("status_color", status_color);

    let context = Context::from_serialize(ReportData::from_result(result))
        .map_err(|e| ChainprobeError::Report(format!("cannot build template context: {}", e)))?;

    tera.render(TEMPLATE_NAME, &context)
        .map_err(|e| ChainprobeError::Report(format!("cannot render template: {}", tera_error_chain(&e))))
}

/// Write the HTML report and return its absolute path
pub fn generate_html_report(result: &SuiteResult, config: &HtmlReportConfig) -> Result<PathBuf, ChainprobeError> {
    let html = render_html_report(result, config.template.as_deref())?;

    fs::create_dir_all(&config.output_dir)?;
    let path = config
        .output_dir
        .join(html_report_file_name(&result.name, chrono::Local::now()));
    let path = std::path::absolute(&path).unwrap_or(path);

    fs::write(&path, html)?;
    info!(path = %path.display(), "HTML report written");

    Ok(path)
}

/// Generate a machine readable report
pub fn generate_report(result: &SuiteResult, config: &ReportConfig) -> Result<(), ChainprobeError> {
    match config.format {
        ReportFormat::JUnit => generate_junit_report(result, config),
        ReportFormat::Json => generate_json_report(result, config),
        ReportFormat::Tap => generate_tap_report(result, config),
    }?;
    info!(path = %config.output_path.display(), format = ?config.format, "Report written");
    Ok(())
}

/// Generate JUnit XML report
pub fn generate_junit_report(result: &SuiteResult, config: &ReportConfig) -> Result<(), ChainprobeError> {
    let mut suite = TestSuite::new(&result.name);
    suite.set_timestamp(OffsetDateTime::now_utc());

    let classname = sanitize_classname(&result.name);
    for record in &result.records {
        let mut test_case = build_test_case(record, config);
        test_case.set_classname(&classname);
        suite.add_testcase(test_case);
    }

    let mut report = Report::new();
    report.add_testsuite(suite);

    let file = File::create(&config.output_path)?;
    report
        .write_xml(file)
        .map_err(|e| ChainprobeError::Report(format!("Failed to write JUnit XML: {}", e)))?;

    Ok(())
}

/// Build a JUnit test case from a step record
fn build_test_case(record: &StepRecord, config: &ReportConfig) -> TestCase {
    let duration = Duration::new(
        record.response_time.as_secs() as i64,
        record.response_time.subsec_nanos() as i32,
    );
    let status = record.actual_status.as_deref().unwrap_or("N/A");

    if let Some(ref error) = record.error {
        // Execution error: nothing to assert against
        let message = if config.include_response_details {
            format!("Step failed: {}\nMethod: {} {}\nStatus: {}", error, record.method, record.url, status)
        } else {
            error.clone()
        };
        return TestCase::error(&record.name, duration, "ExecutionError", &message);
    }

    let failures: Vec<String> = record
        .assertions
        .iter()
        .filter(|a| !a.passed)
        .map(|a| format!("{}: {}", a.assertion, a.message))
        .collect();

    if failures.is_empty() {
        return TestCase::success(&record.name, duration);
    }

    let failure_message = failures.join("\n");
    let message = if config.include_response_details {
        format!(
            "Assertion failures:\n{}\n\nRequest: {} {}\nStatus: {}",
            failure_message, record.method, record.url, status
        )
    } else {
        failure_message
    };

    TestCase::failure(&record.name, duration, "AssertionFailure", &message)
}

/// Sanitize a string for use as a JUnit classname
fn sanitize_classname(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_alphanumeric() || c == '_' || c == '.' { c } else { '_' })
        .collect()
}

/// Generate JSON report
pub fn generate_json_report(result: &SuiteResult, config: &ReportConfig) -> Result<(), ChainprobeError> {
    use serde_json::json;

    let report = json!({
        "name": result.name,
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "summary": {
            "total": result.total(),
            "passed": result.passed(),
            "failed": result.failed(),
            "success_rate": result.success_rate(),
            "total_time_ms": result.total_time.as_millis(),
        },
        "steps": result.records.iter().map(|r| {
            json!({
                "number": r.number,
                "name": r.name,
                "method": r.method,
                "url": r.url,
                "expected_status": r.expected_status,
                "actual_status": r.actual_status,
                "response_time_ms": r.response_time.as_millis(),
                "passed": r.passed(),
                "error": r.error,
                "assertions": r.assertions.iter().map(|a| {
                    json!({
                        "assertion": a.assertion,
                        "passed": a.passed,
                        "message": a.message,
                    })
                }).collect::<Vec<_>>(),
                "extracted": r.extracted.iter().cloned().collect::<serde_json::Map<_, _>>(),
                "logs": r.logs,
            })
        }).collect::<Vec<_>>(),
    });

    let mut file = File::create(&config.output_path)?;
    file.write_all(serde_json::to_string_pretty(&report)?.as_bytes())?;

    Ok(())
}

/// Generate TAP (Test Anything Protocol) report
pub fn generate_tap_report(result: &SuiteResult, config: &ReportConfig) -> Result<(), ChainprobeError> {
    let mut output = String::new();

    output.push_str("TAP version 14\n");
    output.push_str(&format!("1..{}\n", result.total()));

    for record in &result.records {
        if record.passed() {
            output.push_str(&format!(
                "ok {} - {} # time={}ms\n",
                record.number,
                record.name,
                record.response_time.as_millis()
            ));
            continue;
        }

        output.push_str(&format!("not ok {} - {}\n", record.number, record.name));

        // Diagnostics as a YAML block
        output.push_str("  ---\n");
        output.push_str(&format!("  method: {}\n", record.method));
        output.push_str(&format!("  url: {}\n", record.url));
        output.push_str(&format!("  expected_status: {}\n", record.expected_status));
        if let Some(ref status) = record.actual_status {
            output.push_str(&format!("  status: {}\n", status));
        }
        if let Some(ref error) = record.error {
            output.push_str(&format!("  error: {}\n", error));
        }

        let failed: Vec<_> = record.assertions.iter().filter(|a| !a.passed).collect();
        if !failed.is_empty() {
            output.push_str("  failures:\n");
            for a in failed {
                output.push_str(&format!("    - {}: {}\n", a.assertion, a.message));
            }
        }
        output.push_str("  ...\n");
    }

    let mut file = File::create(&config.output_path)?;
    file.write_all(output.as_bytes())?;

    Ok(())
}

fn tera_error_chain(error: &tera::Error) -> String {
    let mut message = error.to_string();
    let mut source = std::error::Error::source(error);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/// Pretty print JSON; strings holding a JSON document are decoded first
fn pretty_json(value: &JsonValue, _args: &HashMap<String, JsonValue>) -> tera::Result<JsonValue> {
    let rendered = match value {
        JsonValue::Null => String::new(),
        JsonValue::String(s) => match serde_json::from_str::<JsonValue>(s) {
            Ok(parsed @ (JsonValue::Object(_) | JsonValue::Array(_))) => {
                serde_json::to_string_pretty(&parsed).unwrap_or_else(|_| s.clone())
            }
            _ => s.clone(),
        },
        other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
    };
    Ok(JsonValue::String(rendered))
}

/// CSS class for an HTTP method badge
fn method_color(value: &JsonValue, _args: &HashMap<String, JsonValue>) -> tera::Result<JsonValue> {
    let method = value.as_str().unwrap_or_default().to_uppercase();
    let class = match method.as_str() {
        "GET" => "method-get",
        "POST" => "method-post",
        "PUT" => "method-put",
        "DELETE" => "method-delete",
        _ => "method-other",
    };
    Ok(JsonValue::String(class.to_string()))
}

/// CSS class for the status badge; `expected` is the expected status line
fn status_color(value: &JsonValue, args: &HashMap<String, JsonValue>) -> tera::Result<JsonValue> {
    let actual = value.as_str().unwrap_or_default().trim();
    let expected = args
        .get("expected")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .trim();
    let class = if !actual.is_empty() && actual == expected {
        "status-match"
    } else {
        "status-mismatch"
    };
    Ok(JsonValue::String(class.to_string()))
}
