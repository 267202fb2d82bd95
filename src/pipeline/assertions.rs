//! Response assertions
//!
//! The status check is an exact string comparison. The body check is a
//! structural "expected is a subset of actual" match:
//! - objects: every expected key must exist in actual and match; extra keys are ignored
//! - arrays: every expected item must match a distinct actual item, in any order
//! - strings: exact, or a regular expression when prefixed with `regex:`
//! - numbers and booleans: equality (integers and floats compare by value)
//! - null or absent: always passes

use regex::Regex;
use serde_json::Value as JsonValue;

use super::extract::kind_name;

/// Prefix marking an expected string as a regular expression
pub const REGEX_PREFIX: &str = "regex:";

/// Result of an assertion check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssertionResult {
    pub assertion: String,
    pub passed: bool,
    pub message: String,
}

impl AssertionResult {
    pub fn pass(assertion: &str, message: &str) -> Self {
        Self {
            assertion: assertion.to_string(),
            passed: true,
            message: message.to_string(),
        }
    }

    pub fn fail(assertion: &str, message: &str) -> Self {
        Self {
            assertion: assertion.to_string(),
            passed: false,
            message: message.to_string(),
        }
    }
}

/// Check the response status line against the expected one
pub fn check_status(expected: &str, actual: &str) -> AssertionResult {
    let assertion = format!("status={}", expected);
    if expected == actual {
        AssertionResult::pass(&assertion, &format!("Status {} matches", actual))
    } else {
        AssertionResult::fail(&assertion, &format!("Expected {}, got {}", expected, actual))
    }
}

/// Pairs expected array items with distinct actual items
///
/// `matches(e, a)` reports whether expected item `e` is satisfied by actual
/// item `a`. On failure the index of an expected item left without a partner
/// is returned.
pub trait ArrayMatcher {
    fn assign(
        &self,
        expected_len: usize,
        actual_len: usize,
        matches: &mut dyn FnMut(usize, usize) -> bool,
    ) -> Result<(), usize>;
}

/// First-fit assignment without backtracking
///
/// Each expected item takes the first unconsumed actual item it matches.
/// This can reject inputs for which some other assignment would succeed.
#[derive(Debug, Clone, Copy, Default)]
pub struct GreedyMatcher;

impl ArrayMatcher for GreedyMatcher {
    fn assign(
        &self,
        expected_len: usize,
        actual_len: usize,
        matches: &mut dyn FnMut(usize, usize) -> bool,
    ) -> Result<(), usize> {
        let mut consumed = vec![false; actual_len];

        for e in 0..expected_len {
            let found = (0..actual_len).find(|&a| !consumed[a] && matches(e, a));
            match found {
                Some(a) => consumed[a] = true,
                None => return Err(e),
            }
        }

        Ok(())
    }
}

/// Outcome of a body validation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Validation {
    pub passed: bool,
    pub diagnostics: Vec<String>,
}

/// Structural validator, generic over the array matching strategy
#[derive(Debug, Clone, Default)]
pub struct Validator<M = GreedyMatcher> {
    matcher: M,
}

impl Validator<GreedyMatcher> {
    pub fn new() -> Self {
        Self { matcher: GreedyMatcher }
    }
}

impl<M: ArrayMatcher> Validator<M> {
    pub fn with_matcher(matcher: M) -> Self {
        Self { matcher }
    }

    /// Validate `actual` against `expected`, collecting diagnostics
    pub fn validate(&self, expected: Option<&JsonValue>, actual: &JsonValue) -> Validation {
        let mut diagnostics = Vec::new();
        let passed = match expected {
            None => true,
            Some(expected) => self.check(expected, actual, "body", &mut Some(&mut diagnostics)),
        };
        Validation { passed, diagnostics }
    }

    /// Validate without producing diagnostics
    pub fn matches(&self, expected: &JsonValue, actual: &JsonValue) -> bool {
        self.check(expected, actual, "body", &mut None)
    }

    fn check(
        &self,
        expected: &JsonValue,
        actual: &JsonValue,
        at: &str,
        diagnostics: &mut Option<&mut Vec<String>>,
    ) -> bool {
        match expected {
            JsonValue::Null => true,

            JsonValue::Object(expected_map) => {
                let JsonValue::Object(actual_map) = actual else {
                    note(diagnostics, at, format!("expected object, got {}", kind_name(actual)));
                    return false;
                };
                for (key, expected_value) in expected_map {
                    let child = format!("{}.{}", at, key);
                    let Some(actual_value) = actual_map.get(key) else {
                        note(diagnostics, at, format!("key '{}' missing", key));
                        return false;
                    };
                    if !self.check(expected_value, actual_value, &child, diagnostics) {
                        return false;
                    }
                }
                true
            }

            JsonValue::Array(expected_items) => {
                let JsonValue::Array(actual_items) = actual else {
                    note(diagnostics, at, format!("expected array, got {}", kind_name(actual)));
                    return false;
                };
                if actual_items.len() < expected_items.len() {
                    note(diagnostics, at, format!(
                        "expected at least {} items, got {}",
                        expected_items.len(),
                        actual_items.len()
                    ));
                    return false;
                }
                let mut item_matches =
                    |e: usize, a: usize| self.check(&expected_items[e], &actual_items[a], at, &mut None);
                match self.matcher.assign(expected_items.len(), actual_items.len(), &mut item_matches) {
                    Ok(()) => true,
                    Err(e) => {
                        note(diagnostics, at, format!(
                            "no unmatched item satisfies expected [{}] {}",
                            e, expected_items[e]
                        ));
                        false
                    }
                }
            }

            JsonValue::String(expected_str) => {
                let JsonValue::String(actual_str) = actual else {
                    note(diagnostics, at, format!("expected string, got {}", kind_name(actual)));
                    return false;
                };
                match expected_str.strip_prefix(REGEX_PREFIX) {
                    Some(pattern) => match Regex::new(pattern) {
                        Ok(re) => {
                            let matched = re.is_match(actual_str);
                            if !matched {
                                note(diagnostics, at, format!("'{}' does not match /{}/", actual_str, pattern));
                            }
                            matched
                        }
                        Err(e) => {
                            note(diagnostics, at, format!("invalid regex pattern '{}': {}", pattern, e));
                            false
                        }
                    },
                    None => {
                        let equal = expected_str == actual_str;
                        if !equal {
                            note(diagnostics, at, format!("expected {:?}, got {:?}", expected_str, actual_str));
                        }
                        equal
                    }
                }
            }

            JsonValue::Number(expected_num) => {
                let equal = match actual {
                    JsonValue::Number(actual_num) => expected_num.as_f64() == actual_num.as_f64(),
                    _ => false,
                };
                if !equal {
                    note(diagnostics, at, format!("expected {}, got {}", expected_num, actual));
                }
                equal
            }

            JsonValue::Bool(expected_bool) => {
                let equal = matches!(actual, JsonValue::Bool(b) if b == expected_bool);
                if !equal {
                    note(diagnostics, at, format!("expected {}, got {}", expected_bool, actual));
                }
                equal
            }
        }
    }
}

fn note(diagnostics: &mut Option<&mut Vec<String>>, at: &str, message: String) {
    if let Some(sink) = diagnostics.as_deref_mut() {
        sink.push(format!("{}: {}", at, message));
    }
}

/// Validate with the default greedy matcher
pub fn validate(expected: Option<&JsonValue>, actual: &JsonValue) -> bool {
    Validator::new().validate(expected, actual).passed
}
