use std::collections::BTreeMap;

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::error::ApiError;

lazy_static! {
    pub static ref USERNAME_RE: Regex = Regex::new(r"^[A-Za-z0-9_]+$").unwrap();
    pub static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    pub static ref DATE_SHAPE_RE: Regex = Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap();
}

/// Expected JSON type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Str,
    Bool,
}

pub enum Check {
    Length {
        min: usize,
        max: usize,
        message: &'static str,
    },
    Pattern {
        re: &'static Regex,
        message: &'static str,
    },
    Predicate {
        test: fn(&str) -> bool,
        message: &'static str,
    },
}

/// One row of a declarative rule table. A rule set is evaluated uniformly
/// over the submitted JSON object and every violation is collected; nothing
/// is fail-fast.
pub struct FieldRule {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    pub nullable: bool,
    pub checks: Vec<Check>,
}

/// Per-field error messages, keyed by field name.
#[derive(Debug, Clone, Default, Serialize, Error)]
#[error("Validation failed")]
pub struct ValidationErrors(pub BTreeMap<String, Vec<String>>);

impl ValidationErrors {
    pub fn push(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Requires a non-empty JSON object body, mirroring the API's
/// "No input data provided" contract for missing/empty payloads.
pub fn require_object(body: &Value) -> Result<&Map<String, Value>, ApiError> {
    body.as_object()
        .filter(|map| !map.is_empty())
        .ok_or(ApiError::BadRequest("No input data provided"))
}

/// Post-validation accessor: a field the rules have already established to
/// be a string, defaulting to "" when absent.
pub fn string_field(body: &Map<String, Value>, name: &str) -> String {
    body.get(name)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

pub fn validate_object(
    rules: &[FieldRule],
    body: &Map<String, Value>,
) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();

    for rule in rules {
        match body.get(rule.name) {
            None => {
                if rule.required {
                    errors.push(rule.name, "Missing data for required field.");
                }
            }
            Some(Value::Null) => {
                if !rule.nullable {
                    errors.push(rule.name, "Field may not be null.");
                }
            }
            Some(value) => check_value(rule, value, &mut errors),
        }
    }

    for name in body.keys() {
        if !rules.iter().any(|rule| rule.name == name) {
            errors.push(name, "Unknown field.");
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_value(rule: &FieldRule, value: &Value, errors: &mut ValidationErrors) {
    match rule.kind {
        FieldKind::Str => {
            let Some(s) = value.as_str() else {
                errors.push(rule.name, "Not a valid string.");
                return;
            };
            for check in &rule.checks {
                match check {
                    Check::Length { min, max, message } => {
                        let len = s.chars().count();
                        if len < *min || len > *max {
                            errors.push(rule.name, *message);
                        }
                    }
                    Check::Pattern { re, message } => {
                        if !re.is_match(s) {
                            errors.push(rule.name, *message);
                        }
                    }
                    Check::Predicate { test, message } => {
                        if !test(s) {
                            errors.push(rule.name, *message);
                        }
                    }
                }
            }
        }
        FieldKind::Bool => {
            if !value.is_boolean() {
                errors.push(rule.name, "Not a valid boolean.");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rules() -> Vec<FieldRule> {
        vec![
            FieldRule {
                name: "title",
                kind: FieldKind::Str,
                required: true,
                nullable: false,
                checks: vec![Check::Length {
                    min: 1,
                    max: 10,
                    message: "Title must be between 1 and 10 characters",
                }],
            },
            FieldRule {
                name: "due_date",
                kind: FieldKind::Str,
                required: false,
                nullable: true,
                checks: vec![Check::Pattern {
                    re: &DATE_SHAPE_RE,
                    message: "Due date must be in YYYY-MM-DD format",
                }],
            },
            FieldRule {
                name: "completed",
                kind: FieldKind::Bool,
                required: false,
                nullable: false,
                checks: vec![],
            },
        ]
    }

    fn as_map(value: Value) -> Map<String, Value> {
        value.as_object().cloned().expect("object literal")
    }

    #[test]
    fn missing_required_field_is_reported() {
        let err = validate_object(&rules(), &as_map(json!({ "completed": true }))).unwrap_err();
        assert_eq!(err.0["title"], vec!["Missing data for required field."]);
    }

    #[test]
    fn all_violations_are_collected_not_fail_fast() {
        let body = as_map(json!({ "due_date": "not-a-date", "completed": "yes" }));
        let err = validate_object(&rules(), &body).unwrap_err();
        assert_eq!(err.0.len(), 3);
        assert!(err.0.contains_key("title"));
        assert!(err.0.contains_key("due_date"));
        assert_eq!(err.0["completed"], vec!["Not a valid boolean."]);
    }

    #[test]
    fn nullable_field_accepts_null_others_reject_it() {
        let ok = validate_object(&rules(), &as_map(json!({ "title": "x", "due_date": null })));
        assert!(ok.is_ok());

        let err =
            validate_object(&rules(), &as_map(json!({ "title": null }))).unwrap_err();
        assert_eq!(err.0["title"], vec!["Field may not be null."]);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let err =
            validate_object(&rules(), &as_map(json!({ "title": "x", "color": "red" })))
                .unwrap_err();
        assert_eq!(err.0["color"], vec!["Unknown field."]);
    }

    #[test]
    fn length_counts_characters_not_bytes() {
        let ok = validate_object(&rules(), &as_map(json!({ "title": "héllo wörld" })));
        // 11 chars is over the 10 limit; "héllo" alone is fine.
        assert!(ok.is_err());
        let ok = validate_object(&rules(), &as_map(json!({ "title": "héllo" })));
        assert!(ok.is_ok());
    }

    #[test]
    fn require_object_rejects_empty_and_non_object_bodies() {
        assert!(require_object(&json!({})).is_err());
        assert!(require_object(&json!([1, 2])).is_err());
        assert!(require_object(&json!(null)).is_err());
        assert!(require_object(&json!({ "a": 1 })).is_ok());
    }
}
