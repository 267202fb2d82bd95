//! Path expressions over JSON values, and extraction into the variable store
//!
//! Supported forms:
//! - `user.name` for object keys
//! - `users[0].id` for array indices
//! - `data[100]` for multi-digit indices
//! - `grid[0][1]` for nested arrays
//! - `[0].name` for arrays at the root

use std::collections::HashMap;

use serde_json::Value as JsonValue;
use thiserror::Error;
use tracing::{info, warn};

use super::variables::{namespaced_key, VariableStore};

/// Why a path could not be resolved
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("segment '{segment}': expected an object but found {found}")]
    NotAnObject { segment: String, found: &'static str },

    #[error("segment '{segment}': key '{key}' not found")]
    KeyMissing { segment: String, key: String },

    #[error("malformed brackets in '{0}'")]
    MalformedBrackets(String),

    #[error("invalid index '{0}'")]
    InvalidIndex(String),

    #[error("index [{index}]: expected an array but found {found}")]
    NotAnArray { index: usize, found: &'static str },

    #[error("index [{index}] out of bounds (array length is {len})")]
    OutOfBounds { index: usize, len: usize },
}

/// Name of a JSON value's kind, for diagnostics
pub fn kind_name(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

/// Resolve `path` against `root`
///
/// An empty path addresses the root itself.
pub fn resolve<'a>(path: &str, root: &'a JsonValue) -> Result<&'a JsonValue, PathError> {
    if path.is_empty() {
        return Ok(root);
    }

    let mut current = root;
    for segment in path.split('.') {
        let (key, mut rest) = match segment.find('[') {
            Some(pos) => segment.split_at(pos),
            None => (segment, ""),
        };

        // An empty key before brackets applies the indices to the current value
        if !key.is_empty() || rest.is_empty() {
            current = lookup_key(current, segment, key)?;
        }

        while !rest.is_empty() {
            let close = rest.find(']');
            let close = match (rest.starts_with('['), close) {
                (true, Some(close)) => close,
                _ => return Err(PathError::MalformedBrackets(rest.to_string())),
            };

            let raw_index = &rest[1..close];
            let index: usize = raw_index
                .parse()
                .map_err(|_| PathError::InvalidIndex(raw_index.to_string()))?;

            let items = match current {
                JsonValue::Array(items) => items,
                other => {
                    return Err(PathError::NotAnArray {
                        index,
                        found: kind_name(other),
                    })
                }
            };

            current = items.get(index).ok_or(PathError::OutOfBounds {
                index,
                len: items.len(),
            })?;

            rest = &rest[close + 1..];
        }
    }

    Ok(current)
}

fn lookup_key<'a>(current: &'a JsonValue, segment: &str, key: &str) -> Result<&'a JsonValue, PathError> {
    match current {
        JsonValue::Object(map) => map.get(key).ok_or_else(|| PathError::KeyMissing {
            segment: segment.to_string(),
            key: key.to_string(),
        }),
        other => Err(PathError::NotAnObject {
            segment: segment.to_string(),
            found: kind_name(other),
        }),
    }
}

/// Values stored by one extraction pass, plus its diagnostic lines
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extraction {
    pub stored: Vec<(String, JsonValue)>,
    pub logs: Vec<String>,
}

/// Store values addressed by `to_store` under `test_<step>_<name>`
///
/// Every entry is attempted; a failing path is logged and skipped.
pub fn extract_variables(
    step_number: usize,
    body: &JsonValue,
    to_store: &HashMap<String, String>,
    store: &mut VariableStore,
) -> Extraction {
    let mut extraction = Extraction::default();

    // Sorted so that logs and store writes happen in a stable order
    let mut entries: Vec<_> = to_store.iter().collect();
    entries.sort();

    for (name, path) in entries {
        let key = namespaced_key(step_number, name);
        match resolve(path, body) {
            Ok(value) => {
                info!(step = step_number, key = %key, value = %value, "Stored variable");
                extraction.logs.push(format!("[NOTE] Stored {} = {}", key, value));
                extraction.stored.push((key.clone(), value.clone()));
                store.insert(key, value.clone());
            }
            Err(e) => {
                warn!(step = step_number, variable = %name, path = %path, error = %e, "Extraction failed");
                extraction.logs.push(format!(
                    "Failed to extract '{}' (path: {}): {}. Tests referencing {} may fail.",
                    name, path, e, key
                ));
            }
        }
    }

    extraction
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_path_returns_root() {
        let root = json!({"a": 1});
        assert_eq!(resolve("", &root), Ok(&root));
    }

    #[test]
    fn test_dotted_keys() {
        let root = json!({"user": {"profile": {"name": "ann"}}});
        assert_eq!(resolve("user.profile.name", &root), Ok(&json!("ann")));
    }

    #[test]
    fn test_root_array_index() {
        let root = json!([{"id": 7}]);
        assert_eq!(resolve("[0].id", &root), Ok(&json!(7)));
    }

    #[test]
    fn test_chained_and_multi_digit_indices() {
        let grid = json!({"grid": [[0, 1], [2, 3]]});
        assert_eq!(resolve("grid[1][0]", &grid), Ok(&json!(2)));

        let items: Vec<JsonValue> = (0..120).map(|i| json!(i)).collect();
        let root = json!({ "data": items });
        assert_eq!(resolve("data[100]", &root), Ok(&json!(100)));
    }

    #[test]
    fn test_out_of_bounds() {
        let root = json!({"a": {"b": [1, 2]}});
        assert_eq!(
            resolve("a.b[5]", &root),
            Err(PathError::OutOfBounds { index: 5, len: 2 })
        );
    }

    #[test]
    fn test_missing_key() {
        let root = json!({"a": 1});
        assert!(matches!(resolve("b", &root), Err(PathError::KeyMissing { .. })));
        assert!(matches!(resolve("b[0]", &root), Err(PathError::KeyMissing { .. })));
    }

    #[test]
    fn test_wrong_container_kinds() {
        let root = json!({"a": [1], "s": "text"});
        assert_eq!(
            resolve("s.x", &root),
            Err(PathError::NotAnObject { segment: "x".to_string(), found: "string" })
        );
        assert_eq!(
            resolve("s[0]", &root),
            Err(PathError::NotAnArray { index: 0, found: "string" })
        );
        assert!(matches!(resolve("a.x", &root), Err(PathError::NotAnObject { found: "array", .. })));
    }

    #[test]
    fn test_malformed_and_invalid_indices() {
        let root = json!({"a": [1, 2]});
        assert_eq!(resolve("a[0", &root), Err(PathError::MalformedBrackets("[0".to_string())));
        assert_eq!(resolve("a[0]x", &root), Err(PathError::MalformedBrackets("x".to_string())));
        assert_eq!(resolve("a[x]", &root), Err(PathError::InvalidIndex("x".to_string())));
        assert_eq!(resolve("a[-1]", &root), Err(PathError::InvalidIndex("-1".to_string())));
    }

    #[test]
    fn test_extract_variables_namespaces_and_continues() {
        let body = json!({"id": 12, "items": [{"sku": "a1"}]});
        let mut to_store = HashMap::new();
        to_store.insert("id".to_string(), "id".to_string());
        to_store.insert("missing".to_string(), "nope".to_string());
        to_store.insert("sku".to_string(), "items[0].sku".to_string());

        let mut store = VariableStore::new();
        let extraction = extract_variables(2, &body, &to_store, &mut store);
        let logs = extraction.logs;

        assert_eq!(store.get("test_2_id"), Some(&json!(12)));
        assert_eq!(store.get("test_2_sku"), Some(&json!("a1")));
        assert!(!store.contains("test_2_missing"));
        assert_eq!(extraction.stored.len(), 2);
        assert_eq!(logs.len(), 3);
        assert!(logs.iter().any(|l| l.contains("Failed to extract 'missing'")));
    }
}
