//! Output validation.
//!
//! Validation runs in two layers: the structural check against the
//! [`SchemaDescriptor`], which reports every mismatch with its path, and serde
//! deserialization into the caller's type. Callers can add semantic checks on
//! the typed value with an [`OutputValidator`].

use serde::de::DeserializeOwned;
use serde_json::{Map, Value as JsonValue};
use std::sync::Arc;

use crate::error::{OutputValidationError, ValidationIssue, ValidationResult};
use crate::schema::{FieldKind, ObjectSchema, SchemaDescriptor};

/// Validate a coerced value and deserialize it into `T`.
pub fn validate<T: DeserializeOwned>(value: JsonValue, schema: &SchemaDescriptor) -> ValidationResult<T> {
    let issues = check(&value, schema);
    if !issues.is_empty() {
        return Err(OutputValidationError::schema(issues));
    }
    serde_json::from_value(value).map_err(OutputValidationError::Deserialize)
}

/// Collect every structural mismatch between `value` and `schema`.
pub fn check(value: &JsonValue, schema: &SchemaDescriptor) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    match value {
        JsonValue::Object(map) => check_object(map, schema, "$", &mut issues),
        other => issues.push(ValidationIssue::new("$", "object", value_kind(other))),
    }
    issues
}

fn check_object(
    map: &Map<String, JsonValue>,
    schema: &ObjectSchema,
    path: &str,
    issues: &mut Vec<ValidationIssue>,
) {
    for (name, field) in schema.fields() {
        let field_path = format!("{path}.{name}");
        match map.get(name) {
            None if field.required => {
                issues.push(ValidationIssue::new(field_path, field.kind.describe(), "missing"));
            }
            None | Some(JsonValue::Null) if !field.required => {}
            Some(value) => check_value(value, &field.kind, &field_path, issues),
            None => {}
        }
    }

    if schema.denies_unknown_fields() {
        for key in map.keys().filter(|k| schema.get(k).is_none()) {
            issues.push(ValidationIssue::new(
                format!("{path}.{key}"),
                "no such field",
                "unknown field",
            ));
        }
    }
}

fn check_value(value: &JsonValue, kind: &FieldKind, path: &str, issues: &mut Vec<ValidationIssue>) {
    match (kind, value) {
        (FieldKind::String, JsonValue::String(_))
        | (FieldKind::Number, JsonValue::Number(_))
        | (FieldKind::Boolean, JsonValue::Bool(_)) => {}
        (FieldKind::Enum(members), JsonValue::String(s)) => {
            if !members.iter().any(|m| m == s) {
                issues.push(ValidationIssue::new(path, kind.describe(), format!("{s:?}")));
            }
        }
        (FieldKind::Array(items), JsonValue::Array(values)) => {
            for (i, item) in values.iter().enumerate() {
                check_value(item, items, &format!("{path}[{i}]"), issues);
            }
        }
        (FieldKind::Object(schema), JsonValue::Object(map)) => {
            check_object(map, schema, path, issues);
        }
        _ => issues.push(ValidationIssue::new(path, kind.describe(), value_kind(value))),
    }
}

fn value_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

/// Additional validation on the typed value.
///
/// A rejection counts as a validation failure for the attempt, so the
/// generator may retry.
pub trait OutputValidator<T>: Send + Sync {
    /// Validate the output, returning it or an error.
    fn validate(&self, value: T) -> ValidationResult<T>;
}

/// Shared validator for dynamic dispatch.
pub type BoxedValidator<T> = Arc<dyn OutputValidator<T>>;

/// Validator that accepts everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpValidator;

impl<T> OutputValidator<T> for NoOpValidator {
    fn validate(&self, value: T) -> ValidationResult<T> {
        Ok(value)
    }
}

/// Wraps a function as a validator.
pub struct SyncValidator<F> {
    func: F,
}

impl<F> SyncValidator<F> {
    /// Create a new sync validator.
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

impl<F, T> OutputValidator<T> for SyncValidator<F>
where
    F: Fn(T) -> ValidationResult<T> + Send + Sync,
{
    fn validate(&self, value: T) -> ValidationResult<T> {
        (self.func)(value)
    }
}

impl<F> std::fmt::Debug for SyncValidator<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncValidator").finish()
    }
}
