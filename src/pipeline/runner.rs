//! Suite execution engine
//!
//! Runs steps strictly in order. Each step substitutes its templates from the
//! variable store, sends the request, validates the response and extracts
//! values for later steps. Step failures are recorded and never stop the run.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use serde_json::Value as JsonValue;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::assertions::{check_status, ArrayMatcher, AssertionResult, GreedyMatcher, Validator};
use super::extract::extract_variables;
use super::suite::{TestStep, TestSuite};
use super::variables::{
    placeholders, substitute, substitute_body, substitute_headers, value_placeholders,
    SubstitutionError, VariableStore,
};
use crate::client::{HttpTransport, ResolvedRequest};
use crate::output::terminal::{self, colors};

/// Header forced onto every request before step headers are applied
const JSON_CONTENT_TYPE: (&str, &str) = ("Content-Type", "application/json");

/// Lifecycle of a single step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepPhase {
    Pending,
    PreProcessed,
    Requested,
    Responded,
    Validated,
    Done,
}

/// Substitution failure for one of the templated step fields
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PreProcessError {
    #[error("Failed to process header: {0}")]
    Header(SubstitutionError),

    #[error("Failed to process url: {0}")]
    Url(SubstitutionError),

    #[error("Failed to process expected_response: {0}")]
    ExpectedResponse(SubstitutionError),

    #[error("Failed to process body: {0}")]
    Body(SubstitutionError),

    #[error("Step has no method")]
    MissingMethod,

    #[error("Step has no url")]
    MissingUrl,
}

/// Outcome of executing one step
#[derive(Debug, Clone)]
pub struct StepRecord {
    /// 1-based position in the suite
    pub number: usize,
    pub name: String,
    pub method: String,
    /// Resolved URL, or the template when pre-processing failed
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<JsonValue>,
    pub expected_status: String,
    pub expected_response: Option<JsonValue>,
    pub actual_status: Option<String>,
    /// Raw response body
    pub actual_response: Option<String>,
    /// Response body parsed as JSON, when it is JSON
    pub actual_json: Option<JsonValue>,
    pub response_time: Duration,
    pub assertions: Vec<AssertionResult>,
    pub extracted: Vec<(String, JsonValue)>,
    pub error: Option<String>,
    pub logs: Vec<String>,
    pub phase: StepPhase,
}

impl StepRecord {
    fn new(number: usize, step: &TestStep) -> Self {
        Self {
            number,
            name: step.label(),
            method: step.method.clone(),
            url: step.url.clone(),
            headers: Vec::new(),
            body: None,
            expected_status: step.expected_status.clone(),
            expected_response: None,
            actual_status: None,
            actual_response: None,
            actual_json: None,
            response_time: Duration::ZERO,
            assertions: Vec::new(),
            extracted: Vec::new(),
            error: None,
            logs: Vec::new(),
            phase: StepPhase::Pending,
        }
    }

    pub fn passed(&self) -> bool {
        self.phase == StepPhase::Done
            && self.error.is_none()
            && !self.assertions.is_empty()
            && self.assertions.iter().all(|a| a.passed)
    }

    fn log(&mut self, line: impl Into<String>) {
        self.logs.push(line.into());
    }

    fn finish_with_error(&mut self, error: String, started: Instant) {
        warn!(step = self.number, error = %error, "Step failed");
        self.log(format!("[FAIL] {}", error));
        self.error = Some(error);
        self.response_time = started.elapsed();
        self.phase = StepPhase::Done;
    }
}

/// All step records of a run
#[derive(Debug, Clone)]
pub struct SuiteResult {
    pub name: String,
    pub records: Vec<StepRecord>,
    pub total_time: Duration,
}

impl SuiteResult {
    pub fn total(&self) -> usize {
        self.records.len()
    }

    pub fn passed(&self) -> usize {
        self.records.iter().filter(|r| r.passed()).count()
    }

    pub fn failed(&self) -> usize {
        self.total() - self.passed()
    }

    /// Integer success percentage, 0 for an empty suite
    pub fn success_rate(&self) -> usize {
        if self.total() == 0 {
            0
        } else {
            self.passed() * 100 / self.total()
        }
    }

    pub fn all_passed(&self) -> bool {
        self.failed() == 0
    }
}

/// Sequential suite executor
pub struct SuiteRunner<T, M = GreedyMatcher> {
    transport: T,
    validator: Validator<M>,
}

impl<T: HttpTransport> SuiteRunner<T, GreedyMatcher> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            validator: Validator::new(),
        }
    }
}

impl<T: HttpTransport, M: ArrayMatcher> SuiteRunner<T, M> {
    /// Use a different array matching strategy for body validation
    pub fn with_validator<N: ArrayMatcher>(self, validator: Validator<N>) -> SuiteRunner<T, N> {
        SuiteRunner {
            transport: self.transport,
            validator,
        }
    }

    /// Run a suite with a fresh store seeded from its variables
    pub async fn run(&self, suite: &TestSuite) -> SuiteResult {
        let mut store = VariableStore::new();
        store.load_globals(suite.variables.clone());
        self.run_with_store(suite, &mut store).await
    }

    /// Run a suite against an existing store
    ///
    /// Values extracted by a step are visible to every later step.
    pub async fn run_with_store(&self, suite: &TestSuite, store: &mut VariableStore) -> SuiteResult {
        info!(suite = %suite.name, tests = suite.tests.len(), "Suite started");
        let started = Instant::now();

        let mut records = Vec::with_capacity(suite.tests.len());
        for (i, step) in suite.tests.iter().enumerate() {
            let record = self.run_step(i + 1, step, store).await;
            records.push(record);
        }

        let result = SuiteResult {
            name: suite.name.clone(),
            records,
            total_time: started.elapsed(),
        };

        info!(
            suite = %result.name,
            total = result.total(),
            passed = result.passed(),
            failed = result.failed(),
            elapsed = %humantime::format_duration(result.total_time),
            "Suite finished"
        );

        result
    }

    /// Execute a single step
    pub async fn run_step(&self, number: usize, step: &TestStep, store: &mut VariableStore) -> StepRecord {
        let started = Instant::now();
        let mut record = StepRecord::new(number, step);
        info!(step = number, method = %step.method, url = %step.url, "Test started");

        let request = match self.pre_process(step, store) {
            Ok((request, expected)) => {
                record.url = request.url.clone();
                record.headers = request.headers.clone();
                record.body = request.body.clone();
                record.expected_response = expected;
                record.phase = StepPhase::PreProcessed;
                request
            }
            Err(e) => {
                record.finish_with_error(e.to_string(), started);
                return record;
            }
        };

        record.phase = StepPhase::Requested;
        let response = match self.transport.execute(&request).await {
            Ok(response) => response,
            Err(e) => {
                record.finish_with_error(format!("Network error: {}", e), started);
                return record;
            }
        };

        record.phase = StepPhase::Responded;
        record.actual_status = Some(response.status.clone());
        record.actual_response = Some(String::from_utf8_lossy(&response.body).into_owned());
        record.actual_json = parse_json_body(&response.body, &mut record.logs);

        let status = check_status(&step.expected_status, &response.status);
        if status.passed {
            record.log("[PASS] Status OK.");
        } else {
            record.log(format!(
                "[FAIL] Status Mismatch. Expected: {} Got: {}",
                step.expected_status, response.status
            ));
        }
        record.assertions.push(status);

        if let Some(body_result) = self.validate_body(&mut record) {
            record.assertions.push(body_result);
        }
        record.phase = StepPhase::Validated;

        if !step.var_to_store.is_empty() {
            match record.actual_json {
                Some(ref body) => {
                    let extraction = extract_variables(number, body, &step.var_to_store, store);
                    record.extracted = extraction.stored;
                    record.logs.extend(extraction.logs);
                }
                None => {
                    warn!(step = number, "Response body is not JSON, skipping variable extraction");
                    record.log("[NOTE] Failed to store body variables: response body is not JSON.");
                }
            }
        }

        record.response_time = started.elapsed();
        record.phase = StepPhase::Done;
        info!(
            step = number,
            passed = record.passed(),
            elapsed = %humantime::format_duration(record.response_time),
            "Test completed"
        );

        record
    }

    /// Substitute headers, URL, expected response and body, in that order
    fn pre_process(
        &self,
        step: &TestStep,
        store: &VariableStore,
    ) -> Result<(ResolvedRequest, Option<JsonValue>), PreProcessError> {
        // Sorted so that headers are sent in a stable order
        let mut custom: Vec<_> = step.header.iter().collect();
        custom.sort();
        let custom = substitute_headers(custom, store).map_err(PreProcessError::Header)?;

        let url = substitute(&step.url, store).map_err(PreProcessError::Url)?;
        if url.trim().is_empty() {
            return Err(PreProcessError::MissingUrl);
        }

        let expected = substitute_body(step.expected_response.as_ref(), store)
            .map_err(PreProcessError::ExpectedResponse)?;

        let body = substitute_body(step.body.as_ref(), store).map_err(PreProcessError::Body)?;

        if step.method.trim().is_empty() {
            return Err(PreProcessError::MissingMethod);
        }

        let request = ResolvedRequest {
            method: step.method.clone(),
            url,
            headers: overlay_headers(custom),
            body: body.filter(|b| !b.is_null()),
        };

        Ok((request, expected))
    }

    fn validate_body(&self, record: &mut StepRecord) -> Option<AssertionResult> {
        let expected = record.expected_response.as_ref().filter(|e| !e.is_null())?;

        let Some(ref actual) = record.actual_json else {
            record.log("[FAIL] Body Mismatch. Response body is not JSON.");
            return Some(AssertionResult::fail("body", "Response body is not JSON"));
        };

        let validation = self.validator.validate(Some(expected), actual);
        if validation.passed {
            record.log("[PASS] Body OK.");
            Some(AssertionResult::pass("body", "Response body matches expected_response"))
        } else {
            let message = validation.diagnostics.join("; ");
            debug!(step = record.number, diagnostics = %message, "Body mismatch");
            record.log("[FAIL] Body Mismatch.");
            record.logs.extend(validation.diagnostics.iter().map(|d| format!("\t{}", d)));
            Some(AssertionResult::fail("body", &message))
        }
    }
}

/// Start from a JSON content type and overlay step headers, case-insensitively
fn overlay_headers(custom: Vec<(String, String)>) -> Vec<(String, String)> {
    let mut headers = vec![(JSON_CONTENT_TYPE.0.to_string(), JSON_CONTENT_TYPE.1.to_string())];
    for (name, value) in custom {
        match headers.iter_mut().find(|(n, _)| n.eq_ignore_ascii_case(&name)) {
            Some(existing) => *existing = (name, value),
            None => headers.push((name, value)),
        }
    }
    headers
}

/// Parse a response body when it looks like a JSON object or array
fn parse_json_body(body: &[u8], logs: &mut Vec<String>) -> Option<JsonValue> {
    let trimmed = body.trim_ascii();
    let Some(&first) = trimmed.first() else {
        logs.push("Body is empty.".to_string());
        return None;
    };

    if first != b'{' && first != b'[' {
        logs.push(format!(
            "Body does not look like JSON (starts with '{}').",
            char::from(first)
        ));
        return None;
    }

    match serde_json::from_slice(trimmed) {
        Ok(value) => Some(value),
        Err(e) => {
            logs.push(format!("Error decoding response body: {}", e));
            None
        }
    }
}

/// Check a suite for placeholders that can never resolve
///
/// A name is known when it is a suite variable, a `--var` override, or a key
/// extracted by an earlier step.
pub fn lint_suite(suite: &TestSuite) -> Vec<String> {
    let mut known: HashSet<String> = suite.variables.keys().cloned().collect();
    let mut warnings = Vec::new();

    for (i, step) in suite.tests.iter().enumerate() {
        let number = i + 1;
        let mut referenced: Vec<String> = placeholders(&step.url);
        for value in step.header.values() {
            referenced.extend(placeholders(value));
        }
        for body in [&step.body, &step.expected_response].into_iter().flatten() {
            referenced.extend(value_placeholders(body));
        }

        if step.url.trim().is_empty() {
            warnings.push(format!("Test {} ({}): url is empty", number, step.label()));
        }
        if step.method.trim().is_empty() {
            warnings.push(format!("Test {} ({}): method is empty", number, step.label()));
        }

        referenced.sort();
        referenced.dedup();
        for name in referenced {
            if !known.contains(&name) {
                warnings.push(format!(
                    "Test {} ({}): variable '{}' is not defined before this step",
                    number,
                    step.label(),
                    name
                ));
            }
        }

        for name in step.var_to_store.keys() {
            known.insert(super::variables::namespaced_key(number, name));
        }

        for (label, body) in [("body", &step.body), ("expected_response", &step.expected_response)] {
            if let Some(value) = body {
                if !(value.is_object() || value.is_array() || value.is_null()) {
                    warnings.push(format!(
                        "Test {} ({}): {} must be an object or array",
                        number,
                        step.label(),
                        label
                    ));
                }
            }
        }
    }

    warnings
}

/// Format suite results for the terminal
pub fn format_suite_results(result: &SuiteResult, color: bool) -> String {
    let paint = |text: &str, f: fn(&str) -> String| if color { f(text) } else { text.to_string() };

    let mut output = String::new();
    output.push_str("\n═══════════════════════════════════════════════════════════════════\n");
    output.push_str(&format!("  {}\n", result.name));
    output.push_str("═══════════════════════════════════════════════════════════════════\n\n");

    for record in &result.records {
        let icon = if record.passed() {
            paint("✓", terminal::success)
        } else {
            paint("✗", terminal::error)
        };

        let status = record.actual_status.as_deref().unwrap_or("---");
        let method = if color { terminal::http_method(&record.method) } else { record.method.clone() };
        output.push_str(&format!(
            "  {} Test {}: {} ({} {})\n",
            icon,
            record.number,
            paint(&record.name, terminal::label),
            method,
            status
        ));
        output.push_str(&format!("      URL: {}\n", paint(&record.url, terminal::muted)));
        output.push_str(&format!(
            "      Time: {}\n",
            humantime::format_duration(round_millis(record.response_time))
        ));

        if let Some(ref error) = record.error {
            let line = format!("Error: {}", error);
            output.push_str(&format!("      {}\n", if color { terminal::colorize(&line, colors::RED) } else { line }));
        }

        for assertion in &record.assertions {
            let mark = if assertion.passed { "✓" } else { "✗" };
            output.push_str(&format!("        {} {}: {}\n", mark, assertion.assertion, assertion.message));
        }

        if !record.extracted.is_empty() {
            output.push_str("      Extracted:\n");
            for (key, value) in &record.extracted {
                output.push_str(&format!("        {} = {}\n", key, value));
            }
        }

        output.push('\n');
    }

    output.push_str("───────────────────────────────────────────────────────────────────\n");
    output.push_str(&format!(
        "  Total: {} | Passed: {} | Failed: {} | Time: {}\n",
        result.total(),
        result.passed(),
        result.failed(),
        humantime::format_duration(round_millis(result.total_time))
    ));
    output.push_str("═══════════════════════════════════════════════════════════════════\n");

    output
}

/// Format suite results as JSON lines, one per step plus a summary line
pub fn format_suite_results_json(result: &SuiteResult) -> String {
    let mut output = String::new();

    for record in &result.records {
        let json = serde_json::json!({
            "level": if record.passed() { "info" } else { "error" },
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "event": "step_result",
            "step": record.number,
            "step_name": record.name,
            "method": record.method,
            "url": record.url,
            "expected_status": record.expected_status,
            "actual_status": record.actual_status,
            "duration_ms": record.response_time.as_millis(),
            "passed": record.passed(),
            "error": record.error,
            "logs": record.logs,
        });
        output.push_str(&json.to_string());
        output.push('\n');
    }

    let summary = serde_json::json!({
        "level": "info",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "event": "suite_summary",
        "suite": result.name,
        "total": result.total(),
        "passed": result.passed(),
        "failed": result.failed(),
        "duration_ms": result.total_time.as_millis(),
        "success": result.all_passed(),
    });
    output.push_str(&summary.to_string());
    output.push('\n');

    output
}

fn round_millis(duration: Duration) -> Duration {
    Duration::from_millis(duration.as_millis() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{TransportError, TransportResponse};
    use serde_json::json;
    use std::cell::RefCell;
    use std::collections::HashMap;

    /// Replies from a fixed table keyed by URL and records every request
    #[derive(Default)]
    struct ScriptedTransport {
        replies: HashMap<String, (String, String)>,
        sent: RefCell<Vec<ResolvedRequest>>,
    }

    impl ScriptedTransport {
        fn reply(mut self, url: &str, status: &str, body: &str) -> Self {
            self.replies.insert(url.to_string(), (status.to_string(), body.to_string()));
            self
        }
    }

    impl HttpTransport for ScriptedTransport {
        async fn execute(&self, request: &ResolvedRequest) -> Result<TransportResponse, TransportError> {
            self.sent.borrow_mut().push(request.clone());
            match self.replies.get(&request.url) {
                Some((status, body)) => Ok(TransportResponse {
                    status: status.clone(),
                    body: bytes::Bytes::from(body.clone()),
                }),
                None => Err(TransportError::Connect(format!("no route to {}", request.url))),
            }
        }
    }

    fn step(url: &str, expected_status: &str) -> TestStep {
        TestStep {
            method: "GET".to_string(),
            url: url.to_string(),
            expected_status: expected_status.to_string(),
            ..Default::default()
        }
    }

    fn suite(tests: Vec<TestStep>) -> TestSuite {
        TestSuite {
            name: "unit".to_string(),
            variables: HashMap::new(),
            tests,
        }
    }

    #[tokio::test]
    async fn test_extracted_value_feeds_next_step() {
        let transport = ScriptedTransport::default()
            .reply("http://api/items", "201 Created", r#"{"id": 41.0, "name": "w"}"#)
            .reply("http://api/items/41", "200 OK", r#"{"id": 41, "name": "w"}"#);

        let mut create = step("http://api/items", "201 Created");
        create.method = "POST".to_string();
        create.body = Some(json!({"name": "w"}));
        create.var_to_store.insert("id".to_string(), "id".to_string());

        let mut fetch = step("http://api/items/$test_1_id$", "200 OK");
        fetch.expected_response = Some(json!({"name": "w"}));

        let runner = SuiteRunner::new(transport);
        let mut store = VariableStore::new();
        let result = runner.run_with_store(&suite(vec![create, fetch]), &mut store).await;

        assert_eq!(result.passed(), 2, "{:#?}", result.records);
        assert_eq!(result.records[1].url, "http://api/items/41");
        assert_eq!(store.get("test_1_id"), Some(&json!(41.0)));
        assert_eq!(result.records[0].extracted, vec![("test_1_id".to_string(), json!(41.0))]);
    }

    #[tokio::test]
    async fn test_missing_variable_skips_request() {
        let transport = ScriptedTransport::default();
        let runner = SuiteRunner::new(transport);

        let result = runner
            .run(&suite(vec![step("http://api/items/$test_1_id$", "200 OK")]))
            .await;

        let record = &result.records[0];
        assert!(!record.passed());
        assert_eq!(record.phase, StepPhase::Done);
        assert!(record.actual_status.is_none());
        assert!(record.error.as_ref().unwrap().contains("Failed to process url"));
        assert!(runner.transport.sent.borrow().is_empty());
    }

    #[tokio::test]
    async fn test_failed_extraction_fails_dependent_step_only() {
        let transport = ScriptedTransport::default()
            .reply("http://api/a", "200 OK", r#"{"other": 1}"#)
            .reply("http://api/c", "200 OK", "{}");

        let mut first = step("http://api/a", "200 OK");
        first.var_to_store.insert("id".to_string(), "id".to_string());
        let second = step("http://api/b/$test_1_id$", "200 OK");
        let third = step("http://api/c", "200 OK");

        let runner = SuiteRunner::new(transport);
        let result = runner.run(&suite(vec![first, second, third])).await;

        assert!(result.records[0].passed());
        assert!(result.records[0].logs.iter().any(|l| l.contains("Failed to extract 'id'")));
        assert!(!result.records[1].passed());
        assert!(result.records[2].passed());
        assert_eq!(runner.transport.sent.borrow().len(), 2);
        assert_eq!((result.passed(), result.failed()), (2, 1));
    }

    #[tokio::test]
    async fn test_extraction_runs_when_step_fails() {
        let transport = ScriptedTransport::default()
            .reply("http://api/items", "500 Internal Server Error", r#"{"id": 5}"#)
            .reply("http://api/items/5", "200 OK", "{}");

        let mut create = step("http://api/items", "200 OK");
        create.var_to_store.insert("id".to_string(), "id".to_string());
        let fetch = step("http://api/items/$test_1_id$", "200 OK");

        let runner = SuiteRunner::new(transport);
        let result = runner.run(&suite(vec![create, fetch])).await;

        assert!(!result.records[0].passed());
        assert_eq!(result.records[0].extracted, vec![("test_1_id".to_string(), json!(5))]);
        assert!(result.records[1].passed());
        assert_eq!(result.records[1].url, "http://api/items/5");
    }

    #[tokio::test]
    async fn test_pre_processing_order_and_failures() {
        let runner = SuiteRunner::new(ScriptedTransport::default());
        let mut store = VariableStore::new();

        let mut bad_header = step("http://api/x", "200 OK");
        bad_header.header.insert("X-Token".to_string(), "$nope$".to_string());
        bad_header.url = "http://api/$also_missing$".to_string();
        let record = runner.run_step(1, &bad_header, &mut store).await;
        assert!(record.error.unwrap().starts_with("Failed to process header"));

        let mut scalar_body = step("http://api/x", "200 OK");
        scalar_body.body = Some(json!("just text"));
        let record = runner.run_step(1, &scalar_body, &mut store).await;
        assert!(record.error.unwrap().starts_with("Failed to process body"));

        let mut bad_expected = step("http://api/x", "200 OK");
        bad_expected.expected_response = Some(json!({"id": "$nope$"}));
        let record = runner.run_step(1, &bad_expected, &mut store).await;
        assert!(record.error.unwrap().starts_with("Failed to process expected_response"));
    }

    #[tokio::test]
    async fn test_transport_error_fails_step_and_run_continues() {
        let transport = ScriptedTransport::default().reply("http://api/ok", "200 OK", "");
        let runner = SuiteRunner::new(transport);
        let result = runner
            .run(&suite(vec![step("http://down/", "200 OK"), step("http://api/ok", "200 OK")]))
            .await;

        assert!(result.records[0].error.as_ref().unwrap().starts_with("Network error"));
        assert!(result.records[1].passed());
        assert_eq!(result.failed(), 1);
    }

    #[tokio::test]
    async fn test_blank_url_or_method_fails_only_that_step() {
        let transport = ScriptedTransport::default()
            .reply("http://api/a", "200 OK", "{}")
            .reply("http://api/c", "200 OK", "{}");

        let mut no_method = step("http://api/a", "200 OK");
        no_method.method = " ".to_string();
        let steps = vec![
            step("http://api/a", "200 OK"),
            step("", "200 OK"),
            step("$blank$", "200 OK"),
            no_method,
            step("http://api/c", "200 OK"),
        ];
        let mut s = suite(steps);
        s.variables.insert("blank".to_string(), json!(" "));

        let runner = SuiteRunner::new(transport);
        let result = runner.run(&s).await;

        assert!(result.records[0].passed());
        assert_eq!(result.records[1].error.as_deref(), Some("Step has no url"));
        assert_eq!(result.records[2].error.as_deref(), Some("Step has no url"));
        assert_eq!(result.records[3].error.as_deref(), Some("Step has no method"));
        assert!(result.records[4].passed());
        assert_eq!((result.passed(), result.failed()), (2, 3));

        let sent: Vec<String> = runner.transport.sent.borrow().iter().map(|r| r.url.clone()).collect();
        assert_eq!(sent, vec!["http://api/a", "http://api/c"]);
    }

    #[tokio::test]
    async fn test_status_and_body_both_required() {
        let transport = ScriptedTransport::default()
            .reply("http://api/a", "200 OK", r#"{"name": "foo"}"#)
            .reply("http://api/b", "500 Internal Server Error", r#"{"name": "bar"}"#)
            .reply("http://api/c", "200 OK", "plain text");

        let mut body_mismatch = step("http://api/a", "200 OK");
        body_mismatch.expected_response = Some(json!({"name": "bar"}));
        let mut status_mismatch = step("http://api/b", "200 OK");
        status_mismatch.expected_response = Some(json!({"name": "bar"}));
        let mut not_json = step("http://api/c", "200 OK");
        not_json.expected_response = Some(json!({"name": "bar"}));

        let runner = SuiteRunner::new(transport);
        let result = runner.run(&suite(vec![body_mismatch, status_mismatch, not_json])).await;

        let first = &result.records[0];
        assert!(!first.passed());
        assert!(first.assertions[0].passed);
        assert!(!first.assertions[1].passed);
        assert!(first.logs.iter().any(|l| l.contains("body.name")));

        let second = &result.records[1];
        assert!(!second.assertions[0].passed);
        assert!(second.assertions[1].passed);

        let third = &result.records[2];
        assert!(!third.passed());
        assert_eq!(third.actual_response.as_deref(), Some("plain text"));
    }

    #[tokio::test]
    async fn test_request_headers_and_body() {
        let transport = ScriptedTransport::default().reply("http://api/x", "200 OK", "{}");
        let mut s = step("http://api/x", "200 OK");
        s.method = "PUT".to_string();
        s.header.insert("content-type".to_string(), "application/merge-patch+json".to_string());
        s.header.insert("X-User".to_string(), "$user$".to_string());
        s.body = Some(json!({"who": "$user$", "n": 2}));

        let mut store = VariableStore::new();
        store.insert("user", json!("ann"));
        let runner = SuiteRunner::new(transport);
        let record = runner.run_step(1, &s, &mut store).await;
        assert!(record.passed());

        let sent = runner.transport.sent.borrow();
        assert_eq!(sent[0].method, "PUT");
        assert_eq!(
            sent[0].headers,
            vec![
                ("content-type".to_string(), "application/merge-patch+json".to_string()),
                ("X-User".to_string(), "ann".to_string()),
            ]
        );
        assert_eq!(sent[0].body, Some(json!({"who": "ann", "n": 2})));
    }

    /// Never pairs anything, so every non-empty expected array fails
    struct RejectAll;

    impl ArrayMatcher for RejectAll {
        fn assign(&self, expected_len: usize, _: usize, _: &mut dyn FnMut(usize, usize) -> bool) -> Result<(), usize> {
            if expected_len == 0 { Ok(()) } else { Err(0) }
        }
    }

    #[tokio::test]
    async fn test_runner_uses_configured_matcher() {
        let transport = ScriptedTransport::default().reply("http://api/list", "200 OK", "[1, 2]");
        let mut s = step("http://api/list", "200 OK");
        s.expected_response = Some(json!([1]));

        let default_runner = SuiteRunner::new(transport);
        assert!(default_runner.run(&suite(vec![s.clone()])).await.all_passed());

        let strict = default_runner.with_validator(Validator::with_matcher(RejectAll));
        assert!(!strict.run(&suite(vec![s])).await.all_passed());
    }

    #[test]
    fn test_overlay_headers_defaults_to_json() {
        let headers = overlay_headers(vec![("Accept".to_string(), "*/*".to_string())]);
        assert_eq!(headers[0], ("Content-Type".to_string(), "application/json".to_string()));
        assert_eq!(headers.len(), 2);
    }

    #[test]
    fn test_parse_json_body() {
        let mut logs = Vec::new();
        assert_eq!(parse_json_body(b"  [1]\n", &mut logs), Some(json!([1])));
        assert_eq!(parse_json_body(b"", &mut logs), None);
        assert_eq!(parse_json_body(b"ok", &mut logs), None);
        assert_eq!(parse_json_body(b"{broken", &mut logs), None);
        assert_eq!(logs.len(), 3);
    }

    #[test]
    fn test_lint_suite() {
        let mut first = step("$base$/items", "201 Created");
        first.var_to_store.insert("id".to_string(), "id".to_string());
        let second = step("$base$/items/$test_1_id$", "200 OK");
        let mut third = step("$base$/items/$test_9_id$", "200 OK");
        third.body = Some(json!(5));

        let mut s = suite(vec![first, second, third]);
        s.variables.insert("base".to_string(), json!("http://api"));

        let warnings = lint_suite(&s);
        assert_eq!(warnings.len(), 2, "{:?}", warnings);
        assert!(warnings[0].contains("test_9_id"));
        assert!(warnings[1].contains("body must be an object or array"));

        let mut blank = step("", "200 OK");
        blank.method = String::new();
        let warnings = lint_suite(&suite(vec![blank]));
        assert_eq!(warnings.len(), 2, "{:?}", warnings);
        assert!(warnings[0].ends_with("url is empty"));
        assert!(warnings[1].ends_with("method is empty"));
    }

    #[test]
    fn test_format_results() {
        let record = StepRecord {
            assertions: vec![AssertionResult::pass("status=200 OK", "Status 200 OK matches")],
            actual_status: Some("200 OK".to_string()),
            phase: StepPhase::Done,
            ..StepRecord::new(1, &step("http://api/x", "200 OK"))
        };
        let result = SuiteResult {
            name: "fmt".to_string(),
            records: vec![record],
            total_time: Duration::from_millis(12),
        };

        let text = format_suite_results(&result, false);
        assert!(text.contains("✓ Test 1: [GET] http://api/x (GET 200 OK)"));
        assert!(text.contains("Total: 1 | Passed: 1 | Failed: 0"));

        let lines = format_suite_results_json(&result);
        assert_eq!(lines.lines().count(), 2);
        assert!(lines.contains("\"event\":\"suite_summary\""));
    }
}
