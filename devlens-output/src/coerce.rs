//! Schema-guided coercion.
//!
//! Models get the shape right far more often than the scalars: percentages
//! arrive as `"75%"`, booleans as `"yes"`, enum members in the wrong case.
//! [`coerce`] normalizes those before validation. It is total: it never fails
//! and never drops a field the model supplied.

use serde_json::{Map, Value as JsonValue};

use crate::schema::{FieldKind, ObjectSchema};

/// Coerce a parsed value against a schema.
///
/// Non-object values are returned unchanged for the validator to reject.
pub fn coerce(value: JsonValue, schema: &ObjectSchema) -> JsonValue {
    match value {
        JsonValue::Object(map) => JsonValue::Object(coerce_object(map, schema)),
        other => other,
    }
}

fn coerce_object(mut map: Map<String, JsonValue>, schema: &ObjectSchema) -> Map<String, JsonValue> {
    for (name, field) in schema.fields() {
        if !map.contains_key(name) {
            if let Some(alias) = case_variant(&map, name, schema) {
                if let Some(value) = map.remove(&alias) {
                    map.insert(name.to_string(), value);
                }
            }
        }

        match map.get_mut(name) {
            Some(slot) => {
                let value = slot.take();
                *slot = coerce_field(value, &field.kind);
            }
            None => {
                if let Some(default) = default_for(&field.kind) {
                    map.insert(name.to_string(), default);
                }
            }
        }
    }
    map
}

/// A supplied key that matches `name` only by case and is not itself declared.
fn case_variant(map: &Map<String, JsonValue>, name: &str, schema: &ObjectSchema) -> Option<String> {
    let mut matches = map
        .keys()
        .filter(|k| k.eq_ignore_ascii_case(name) && schema.get(k).is_none());
    let first = matches.next()?;
    // Ambiguous casing is left for the validator
    matches.next().is_none().then(|| first.clone())
}

fn default_for(kind: &FieldKind) -> Option<JsonValue> {
    match kind {
        FieldKind::Array(_) => Some(JsonValue::Array(Vec::new())),
        FieldKind::String => Some(JsonValue::String(String::new())),
        _ => None,
    }
}

fn coerce_field(value: JsonValue, kind: &FieldKind) -> JsonValue {
    match (kind, value) {
        (FieldKind::Number, JsonValue::String(s)) => JsonValue::from(coerce_percentage(&s)),
        (FieldKind::Boolean, JsonValue::String(s)) => JsonValue::Bool(coerce_bool(&s)),
        (FieldKind::Boolean, JsonValue::Number(n)) => JsonValue::Bool(n.as_f64() == Some(1.0)),
        (FieldKind::Enum(members), JsonValue::String(s)) => {
            JsonValue::String(coerce_enum(members, &s).unwrap_or(s))
        }
        (FieldKind::Array(items), JsonValue::Array(values)) => JsonValue::Array(
            values
                .into_iter()
                .map(|v| coerce_field(v, items))
                .collect(),
        ),
        (FieldKind::Object(schema), JsonValue::Object(map)) => {
            JsonValue::Object(coerce_object(map, schema))
        }
        (_, other) => other,
    }
}

/// Read a percentage-like string as an integer in `[0, 100]`.
///
/// `"75%"` → 75, `" 85 % "` → 85, `"75.5%"` → 76, `"150%"` → 100,
/// `"-10%"` → 0. Anything non-numeric is 0.
#[must_use]
pub fn coerce_percentage(text: &str) -> i64 {
    let cleaned = text.replace('%', "");
    match cleaned.trim().parse::<f64>() {
        Ok(n) if n.is_finite() => n.round().clamp(0.0, 100.0) as i64,
        _ => 0,
    }
}

/// Read a boolean-like string. Unrecognized strings are `false`.
#[must_use]
pub fn coerce_bool(text: &str) -> bool {
    matches!(
        text.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes"
    )
}

/// Match `text` case-insensitively against enum members, returning the
/// canonical member.
#[must_use]
pub fn coerce_enum(members: &[String], text: &str) -> Option<String> {
    let folded = text.trim().to_lowercase();
    members.iter().find(|m| m.to_lowercase() == folded).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use serde_json::json;

    fn review_schema() -> ObjectSchema {
        ObjectSchema::new()
            .field("summary", FieldKind::String)
            .field("score", FieldKind::Number)
            .field("approved", FieldKind::Boolean)
            .field("severity", FieldKind::enumeration(["low", "medium", "high"]))
            .field("issues", FieldKind::array(FieldKind::String))
            .field("suggestions", FieldKind::array(FieldKind::String))
    }

    #[rstest]
    #[case("75%", 75)]
    #[case(" 85 % ", 85)]
    #[case("150%", 100)]
    #[case("-10%", 0)]
    #[case("75.5%", 76)]
    #[case("0%", 0)]
    #[case("100", 100)]
    #[case("invalid", 0)]
    #[case("NaN", 0)]
    #[case("inf%", 0)]
    fn test_percentage(#[case] input: &str, #[case] expected: i64) {
        assert_eq!(coerce_percentage(input), expected);
    }

    #[test]
    fn test_percentage_range_matches_clamped_rounding() {
        for tenths in -100..=1500 {
            let n = f64::from(tenths) / 10.0;
            let expected = n.round().clamp(0.0, 100.0) as i64;
            assert_eq!(coerce_percentage(&format!("{n}%")), expected, "input {n}%");
            assert_eq!(coerce_percentage(&format!("  {n} % ")), expected, "input {n} %");
        }
    }

    #[rstest]
    #[case("true", true)]
    #[case("TRUE", true)]
    #[case("yes", true)]
    #[case("Yes", true)]
    #[case("1", true)]
    #[case("false", false)]
    #[case("FALSE", false)]
    #[case("no", false)]
    #[case("0", false)]
    #[case("maybe", false)]
    #[case("", false)]
    fn test_bool(#[case] input: &str, #[case] expected: bool) {
        assert_eq!(coerce_bool(input), expected);
    }

    #[test]
    fn test_enum_case_folding() {
        let members = vec!["A".to_string(), "B".to_string()];
        assert_eq!(coerce_enum(&members, "b"), Some("B".to_string()));
        assert_eq!(coerce_enum(&members, "C"), None);

        let levels = vec!["low".to_string(), "high".to_string()];
        for variant in ["HIGH", "High", "hIgH", "high"] {
            assert_eq!(coerce_enum(&levels, variant), Some("high".to_string()));
        }
    }

    #[test]
    fn test_coerce_review_object() {
        let value = json!({
            "summary": "Looks good",
            "score": "85%",
            "approved": "yes",
            "severity": "HIGH",
            "issues": ["a"],
        });
        assert_eq!(
            coerce(value, &review_schema()),
            json!({
                "summary": "Looks good",
                "score": 85,
                "approved": true,
                "severity": "high",
                "issues": ["a"],
                "suggestions": [],
            })
        );
    }

    #[test]
    fn test_missing_fields_get_defaults() {
        let coerced = coerce(json!({"score": 10}), &review_schema());
        assert_eq!(coerced["issues"], json!([]));
        assert_eq!(coerced["suggestions"], json!([]));
        assert_eq!(coerced["summary"], json!(""));
        // No default for scalars other than strings
        assert!(coerced.get("approved").is_none());
        assert!(coerced.get("severity").is_none());
    }

    #[test]
    fn test_unknown_enum_and_fields_pass_through() {
        let coerced = coerce(
            json!({"severity": "critical", "extra": {"kept": true}}),
            &review_schema(),
        );
        assert_eq!(coerced["severity"], json!("critical"));
        assert_eq!(coerced["extra"], json!({"kept": true}));
    }

    #[test]
    fn test_numeric_values_untouched() {
        let coerced = coerce(json!({"score": 250, "approved": true}), &review_schema());
        assert_eq!(coerced["score"], json!(250));
        assert_eq!(coerced["approved"], json!(true));
    }

    #[test]
    fn test_boolean_from_number() {
        let coerced = coerce(json!({"approved": 1}), &review_schema());
        assert_eq!(coerced["approved"], json!(true));
        let coerced = coerce(json!({"approved": 0}), &review_schema());
        assert_eq!(coerced["approved"], json!(false));
    }

    #[test]
    fn test_key_casing_is_normalized() {
        let coerced = coerce(json!({"Summary": "ok", "APPROVED": "no"}), &review_schema());
        assert_eq!(coerced["summary"], json!("ok"));
        assert_eq!(coerced["approved"], json!(false));
        assert!(coerced.get("Summary").is_none());
    }

    #[test]
    fn test_ambiguous_key_casing_is_left_alone() {
        let coerced = coerce(json!({"Summary": "a", "SUMMARY": "b"}), &review_schema());
        assert_eq!(coerced["summary"], json!(""));
        assert_eq!(coerced["Summary"], json!("a"));
        assert_eq!(coerced["SUMMARY"], json!("b"));
    }

    #[test]
    fn test_nested_objects_and_arrays_recurse() {
        let finding = ObjectSchema::new()
            .field("line", FieldKind::Number)
            .field("level", FieldKind::enumeration(["info", "error"]))
            .field("notes", FieldKind::array(FieldKind::String));
        let schema = ObjectSchema::new()
            .field("findings", FieldKind::array(FieldKind::Object(finding.clone())))
            .field("primary", FieldKind::Object(finding));

        let coerced = coerce(
            json!({
                "findings": [{"line": "12%", "level": "ERROR"}],
                "primary": {"level": "Info", "line": 3}
            }),
            &schema,
        );
        assert_eq!(
            coerced,
            json!({
                "findings": [{"line": 12, "level": "error", "notes": []}],
                "primary": {"level": "info", "line": 3, "notes": []}
            })
        );
    }

    #[test]
    fn test_non_object_root_is_unchanged() {
        assert_eq!(coerce(json!([1, 2]), &review_schema()), json!([1, 2]));
    }
}
