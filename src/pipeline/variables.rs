//! Variable store and `$name$` placeholder substitution
//!
//! Templates reference stored values with `$name$`. A scan toggles between
//! literal text and placeholder names on every `$`; a name that is not in the
//! store fails the whole template, so callers never see partial output.

use std::collections::HashMap;

use serde_json::Value as JsonValue;
use thiserror::Error;
use tracing::debug;

/// Placeholder delimiter
const DELIMITER: char = '$';

/// Failure while substituting placeholders
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubstitutionError {
    #[error("variable '{0}' is not present in variables")]
    UndefinedVariable(String),

    #[error("expected an object or array, got {0}")]
    NotAContainer(&'static str),
}

/// Values available to templates for the length of one run
///
/// Keys are never removed; a later write to the same key overwrites it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VariableStore {
    values: HashMap<String, JsonValue>,
}

impl VariableStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bulk-load suite level variables
    pub fn load_globals<I>(&mut self, globals: I)
    where
        I: IntoIterator<Item = (String, JsonValue)>,
    {
        self.values.extend(globals);
    }

    pub fn insert(&mut self, key: impl Into<String>, value: JsonValue) {
        self.values.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        self.values.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &JsonValue)> {
        self.values.iter()
    }
}

/// Key under which a value extracted by step `step_number` is stored
pub fn namespaced_key(step_number: usize, name: &str) -> String {
    format!("test_{}_{}", step_number, name)
}

/// Render a stored value as template text
///
/// Floats print in their shortest form with no forced fraction, so `3.0`
/// becomes `3`. Containers and null fall back to compact JSON.
pub fn stringify(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        JsonValue::Bool(b) => b.to_string(),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                i.to_string()
            } else if let Some(u) = n.as_u64() {
                u.to_string()
            } else {
                n.as_f64()
                    .map(|f| f.to_string())
                    .unwrap_or_else(|| n.to_string())
            }
        }
        JsonValue::Null | JsonValue::Array(_) | JsonValue::Object(_) => value.to_string(),
    }
}

/// Replace every `$name$` in `template` with the stored value
///
/// A trailing `$name` with no closing delimiter is dropped silently.
pub fn substitute(template: &str, store: &VariableStore) -> Result<String, SubstitutionError> {
    let mut result = String::with_capacity(template.len());
    let mut name = String::new();
    let mut in_placeholder = false;

    for c in template.chars() {
        match (c == DELIMITER, in_placeholder) {
            (false, false) => result.push(c),
            (true, false) => in_placeholder = true,
            (false, true) => name.push(c),
            (true, true) => {
                in_placeholder = false;
                let value = store
                    .get(&name)
                    .ok_or_else(|| SubstitutionError::UndefinedVariable(name.clone()))?;
                result.push_str(&stringify(value));
                name.clear();
            }
        }
    }

    if in_placeholder {
        debug!(pending = %name, "Dropping unterminated placeholder");
    }

    Ok(result)
}

/// Substitute every string leaf of a JSON tree in place
///
/// Stops at the first failing leaf; leaves visited before it keep their new
/// text, so callers should discard the value on error.
pub fn substitute_value(value: &mut JsonValue, store: &VariableStore) -> Result<(), SubstitutionError> {
    match value {
        JsonValue::String(s) => {
            *s = substitute(s, store)?;
        }
        JsonValue::Array(items) => {
            for item in items.iter_mut() {
                substitute_value(item, store)?;
            }
        }
        JsonValue::Object(map) => {
            for (_, item) in map.iter_mut() {
                substitute_value(item, store)?;
            }
        }
        JsonValue::Null | JsonValue::Bool(_) | JsonValue::Number(_) => {}
    }
    Ok(())
}

/// Substitute a request body or expected response
///
/// Absent and null bodies have nothing to substitute. Any other top level value
/// must be an object or array.
pub fn substitute_body(body: Option<&JsonValue>, store: &VariableStore) -> Result<Option<JsonValue>, SubstitutionError> {
    let Some(body) = body else {
        return Ok(None);
    };

    match body {
        JsonValue::Null => Ok(Some(JsonValue::Null)),
        JsonValue::Object(_) | JsonValue::Array(_) => {
            let mut rendered = body.clone();
            substitute_value(&mut rendered, store)?;
            Ok(Some(rendered))
        }
        JsonValue::String(_) => Err(SubstitutionError::NotAContainer("string")),
        JsonValue::Number(_) => Err(SubstitutionError::NotAContainer("number")),
        JsonValue::Bool(_) => Err(SubstitutionError::NotAContainer("boolean")),
    }
}

/// Substitute every header value, keeping header names as written
pub fn substitute_headers<'a, I>(headers: I, store: &VariableStore) -> Result<Vec<(String, String)>, SubstitutionError>
where
    I: IntoIterator<Item = (&'a String, &'a String)>,
{
    headers
        .into_iter()
        .map(|(name, value)| Ok((name.clone(), substitute(value, store)?)))
        .collect()
}

/// Names referenced by complete `$name$` placeholders in `template`
pub fn placeholders(template: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut name = String::new();
    let mut in_placeholder = false;

    for c in template.chars() {
        if c == DELIMITER {
            if in_placeholder {
                names.push(std::mem::take(&mut name));
            }
            in_placeholder = !in_placeholder;
        } else if in_placeholder {
            name.push(c);
        }
    }

    names
}

/// Placeholder names referenced anywhere in a JSON tree
pub fn value_placeholders(value: &JsonValue) -> Vec<String> {
    match value {
        JsonValue::String(s) => placeholders(s),
        JsonValue::Array(items) => items.iter().flat_map(value_placeholders).collect(),
        JsonValue::Object(map) => map.values().flat_map(value_placeholders).collect(),
        JsonValue::Null | JsonValue::Bool(_) | JsonValue::Number(_) => Vec::new(),
    }
}
