//! Suite definition and loading
//!
//! A suite is a JSON (or YAML/TOML) document with a name, initial variables and
//! an ordered list of test steps.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::errors::ChainprobeError;

/// Maximum suite file size (1 MB)
const MAX_SUITE_FILE_SIZE: u64 = 1024 * 1024;

/// A named, ordered collection of test steps
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TestSuite {
    /// Name of the suite
    pub name: String,

    /// Initial variables, visible to every step
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub variables: HashMap<String, JsonValue>,

    /// Steps, executed in order
    #[serde(default)]
    pub tests: Vec<TestStep>,
}

/// A single HTTP call and its expected outcome
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TestStep {
    /// Informational step number from the document
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num: Option<u32>,

    /// Optional label used in output and reports
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// HTTP method
    #[serde(default = "default_method")]
    pub method: String,

    /// URL template; a blank one fails only this step
    #[serde(default)]
    pub url: String,

    /// Header templates
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub header: HashMap<String, String>,

    /// Request body template
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<JsonValue>,

    /// Expected status line, compared exactly (e.g. "200 OK")
    #[serde(default)]
    pub expected_status: String,

    /// Expected response body template
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_response: Option<JsonValue>,

    /// Variable name to path expression, evaluated against the response body
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub var_to_store: HashMap<String, String>,
}

fn default_method() -> String {
    "GET".to_string()
}

impl TestStep {
    /// Label for output: the step name, or method and URL template
    pub fn label(&self) -> String {
        match self.name {
            Some(ref name) if !name.is_empty() => name.clone(),
            _ => format!("[{}] {}", self.method, self.url),
        }
    }
}

/// Load a suite from disk
///
/// Any failure here is fatal for the run: there is nothing valid to execute.
pub fn load_suite(path: &Path) -> Result<TestSuite, ChainprobeError> {
    let metadata = fs::metadata(path).map_err(|e| {
        ChainprobeError::Suite(format!("cannot read {}: {}", path.display(), e))
    })?;

    if metadata.len() > MAX_SUITE_FILE_SIZE {
        return Err(ChainprobeError::Suite(format!(
            "suite file too large: {} bytes (max {} bytes)",
            metadata.len(),
            MAX_SUITE_FILE_SIZE
        )));
    }

    let content = fs::read_to_string(path).map_err(|e| {
        ChainprobeError::Suite(format!("cannot read {}: {}", path.display(), e))
    })?;

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    parse_suite(&content, &extension)
}

/// Parse suite text; `extension` selects the format, JSON when unknown
pub fn parse_suite(content: &str, extension: &str) -> Result<TestSuite, ChainprobeError> {
    let suite: TestSuite = match extension {
        "yaml" | "yml" => serde_yaml::from_str(content)
            .map_err(|e| ChainprobeError::Suite(format!("cannot decode YAML suite: {}", e)))?,
        "toml" => toml::from_str(content)
            .map_err(|e| ChainprobeError::Suite(format!("cannot decode TOML suite: {}", e)))?,
        _ => serde_json::from_str(content)
            .map_err(|e| ChainprobeError::Suite(format!("cannot decode suite: {}", e)))?,
    };

    Ok(suite)
}

/// Apply `NAME=VALUE` overrides to the suite variables
///
/// Values are parsed as JSON when possible and kept as strings otherwise.
pub fn apply_cli_variables(suite: &mut TestSuite, vars: &[String]) -> Result<(), ChainprobeError> {
    for var in vars {
        if let Some((key, value)) = var.split_once('=') {
            let json_value = serde_json::from_str(value)
                .unwrap_or_else(|_| JsonValue::String(value.to_string()));
            suite.variables.insert(key.to_string(), json_value);
        } else {
            return Err(ChainprobeError::Argument(format!(
                "Invalid variable format: {}. Use NAME=VALUE",
                var
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SUITE_JSON: &str = r#"{
        "name": "Items API",
        "variables": {"base": "http://localhost:8080", "count": 3.0},
        "tests": [
            {
                "method": "POST",
                "url": "$base$/items",
                "header": {"Authorization": "Bearer $token$"},
                "body": {"name": "widget"},
                "expected_status": "201 Created",
                "expected_response": {"name": "widget"},
                "var_to_store": {"id": "id"}
            },
            {
                "url": "$base$/items/$test_1_id$",
                "expected_status": "200 OK"
            }
        ]
    }"#;

    #[test]
    fn test_parse_json_suite() {
        let suite = parse_suite(SUITE_JSON, "json").unwrap();
        assert_eq!(suite.name, "Items API");
        assert_eq!(suite.variables.get("count"), Some(&json!(3.0)));
        assert_eq!(suite.tests.len(), 2);

        let first = &suite.tests[0];
        assert_eq!(first.method, "POST");
        assert_eq!(first.header.get("Authorization").unwrap(), "Bearer $token$");
        assert_eq!(first.var_to_store.get("id").unwrap(), "id");

        let second = &suite.tests[1];
        assert_eq!(second.method, "GET");
        assert!(second.body.is_none());
        assert!(second.expected_response.is_none());
    }

    #[test]
    fn test_parse_yaml_suite() {
        let yaml = r#"
name: yaml suite
tests:
  - method: DELETE
    url: http://localhost/items/1
    expected_status: "204 No Content"
"#;
        let suite = parse_suite(yaml, "yaml").unwrap();
        assert_eq!(suite.tests[0].method, "DELETE");
        assert_eq!(suite.tests[0].expected_status, "204 No Content");
    }

    #[test]
    fn test_parse_toml_suite() {
        let toml = r#"
name = "toml suite"

[[tests]]
url = "http://localhost/health"
expected_status = "200 OK"

[tests.expected_response]
status = "up"
"#;
        let suite = parse_suite(toml, "toml").unwrap();
        assert_eq!(suite.tests[0].expected_response, Some(json!({"status": "up"})));
    }

    #[test]
    fn test_invalid_suite_is_fatal() {
        assert!(matches!(parse_suite("not json", "json"), Err(ChainprobeError::Suite(_))));
    }

    #[test]
    fn test_blank_url_and_method_still_load() {
        let content = r#"{"name": "x", "tests": [{"url": " "}, {"method": ""}, {"url": "/ok"}]}"#;
        let suite = parse_suite(content, "json").unwrap();
        assert_eq!(suite.tests.len(), 3);
        assert_eq!(suite.tests[0].url, " ");
        assert_eq!(suite.tests[1].url, "");
        assert_eq!(suite.tests[1].method, "");
        assert_eq!(suite.tests[2].method, "GET");
    }

    #[test]
    fn test_load_suite_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("suite.json");
        std::fs::write(&path, SUITE_JSON).unwrap();
        let suite = load_suite(&path).unwrap();
        assert_eq!(suite.tests.len(), 2);

        assert!(load_suite(&dir.path().join("absent.json")).is_err());
    }

    #[test]
    fn test_apply_cli_variables() {
        let mut suite = TestSuite::default();
        apply_cli_variables(&mut suite, &["n=42".to_string(), "s=hello".to_string()]).unwrap();
        assert_eq!(suite.variables.get("n"), Some(&json!(42)));
        assert_eq!(suite.variables.get("s"), Some(&json!("hello")));

        assert!(apply_cli_variables(&mut suite, &["novalue".to_string()]).is_err());
    }

    #[test]
    fn test_step_label() {
        let mut step = TestStep {
            method: "GET".to_string(),
            url: "/a".to_string(),
            ..Default::default()
        };
        assert_eq!(step.label(), "[GET] /a");
        step.name = Some("Fetch".to_string());
        assert_eq!(step.label(), "Fetch");
    }
}
