//! Candidate extraction.
//!
//! This module isolates the region of a model response most likely to hold
//! the JSON payload. It does no repair of its own; see [`crate::repair`].

use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;

use crate::error::{OutputParseError, ParseResult};
use crate::repair::RepairFix;

/// Where in the model output a candidate was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateSource {
    /// Body of a fenced markdown code block.
    FencedBlock,
    /// Span from the first `{` to the last `}`.
    BraceSpan,
    /// From the first `{` to the end of the text (no closing brace after it).
    Unterminated,
}

/// The substring judged most likely to be the payload, plus its repair history.
///
/// A candidate always starts with `{`, so it is never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    text: String,
    source: CandidateSource,
    repairs: Vec<RepairFix>,
}

impl Candidate {
    pub(crate) fn new(text: impl Into<String>, source: CandidateSource) -> Self {
        Self {
            text: text.into(),
            source,
            repairs: Vec::new(),
        }
    }

    /// The candidate text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Where the candidate came from.
    #[must_use]
    pub fn source(&self) -> CandidateSource {
        self.source
    }

    /// Fixes applied so far, in order.
    #[must_use]
    pub fn repairs(&self) -> &[RepairFix] {
        &self.repairs
    }

    /// Whether any repair changed the text.
    #[must_use]
    pub fn was_repaired(&self) -> bool {
        !self.repairs.is_empty()
    }

    /// Consume the candidate, returning its text.
    #[must_use]
    pub fn into_text(self) -> String {
        self.text
    }

    pub(crate) fn apply(&mut self, fix: RepairFix, text: String) {
        self.text = text;
        self.repairs.push(fix);
    }

    /// Parse the candidate text as-is.
    pub fn parse(&self) -> ParseResult<JsonValue> {
        serde_json::from_str(&self.text).map_err(OutputParseError::JsonParse)
    }
}

/// Extract the JSON candidate from model output.
///
/// Priority order:
/// 1. A fenced code block whose body starts with `{`
/// 2. The span from the first `{` to the last `}`
/// 3. The text from the first `{` to the end when no `}` follows it
///
/// # Example
///
/// ```rust
/// use devlens_output::parser::extract_candidate;
///
/// let text = r#"Sure! Here is the verdict: {"approved": true} Hope that helps."#;
/// let candidate = extract_candidate(text).unwrap();
/// assert_eq!(candidate.text(), r#"{"approved": true}"#);
/// ```
pub fn extract_candidate(text: &str) -> ParseResult<Candidate> {
    let text = text.trim();

    if let Some(body) = find_fenced_object(text) {
        return Ok(Candidate::new(body, CandidateSource::FencedBlock));
    }

    let start = text.find('{').ok_or(OutputParseError::NoJsonFound)?;
    match text.rfind('}') {
        Some(end) if end > start => Ok(Candidate::new(
            &text[start..=end],
            CandidateSource::BraceSpan,
        )),
        _ => Ok(Candidate::new(
            text[start..].trim_end(),
            CandidateSource::Unterminated,
        )),
    }
}

/// Find the first fenced block whose trimmed body looks like an object.
///
/// An unclosed fence runs to the end of the text.
fn find_fenced_object(text: &str) -> Option<&str> {
    let mut rest = text;

    while let Some(open) = rest.find("```") {
        let after = &rest[open + 3..];

        // Skip the info string (`json`, `JSON`, ...) unless the object starts on the fence line
        let info_end = after.find('\n').unwrap_or(after.len());
        let body_start = if after[..info_end].trim_start().starts_with('{') {
            0
        } else {
            (info_end + 1).min(after.len())
        };
        let block = &after[body_start..];

        let (body, next) = match block.find("```") {
            Some(close) => (&block[..close], &block[close + 3..]),
            None => (block, ""),
        };

        let body = body.trim();
        if body.starts_with('{') {
            return Some(body);
        }
        rest = next;
    }
    None
}

/// Extract and parse JSON from text without any repair.
///
/// This is the strict path: the extracted candidate must already be valid.
pub fn parse_json_from_text<T: DeserializeOwned>(text: &str) -> ParseResult<T> {
    let candidate = extract_candidate(text)?;
    serde_json::from_str(candidate.text()).map_err(OutputParseError::JsonParse)
}

/// Parse a JSON value into a typed value.
pub fn parse_json_value<T: DeserializeOwned>(value: &JsonValue) -> ParseResult<T> {
    serde_json::from_value(value.clone()).map_err(OutputParseError::JsonParse)
}

/// Check if text appears to contain a JSON object.
pub fn looks_like_json(text: &str) -> bool {
    text.contains('{')
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct TestStruct {
        name: String,
        value: i32,
    }

    #[test]
    fn test_extract_pure_json_object() {
        let text = r#"{"name": "test", "value": 42}"#;
        let candidate = extract_candidate(text).unwrap();
        assert_eq!(candidate.text(), text);
        assert_eq!(candidate.source(), CandidateSource::BraceSpan);
    }

    #[test]
    fn test_extract_markdown_json_block() {
        let text = r#"Here is the result:
```json
{"name": "test", "value": 42}
```
Done! {"ignored": true}"#;
        let candidate = extract_candidate(text).unwrap();
        assert_eq!(candidate.text(), r#"{"name": "test", "value": 42}"#);
        assert_eq!(candidate.source(), CandidateSource::FencedBlock);
    }

    #[test]
    fn test_extract_markdown_plain_block() {
        let text = "```\n{\"key\": \"value\"}\n```";
        let candidate = extract_candidate(text).unwrap();
        assert_eq!(candidate.text(), r#"{"key": "value"}"#);
    }

    #[test]
    fn test_extract_skips_non_object_fences() {
        let text = "```python\nprint('hi')\n```\nthen\n```json\n{\"a\": 1}\n```";
        let candidate = extract_candidate(text).unwrap();
        assert_eq!(candidate.text(), r#"{"a": 1}"#);
    }

    #[test]
    fn test_extract_unclosed_fence_runs_to_end() {
        let text = "```json\n{\"a\": [1, 2";
        let candidate = extract_candidate(text).unwrap();
        assert_eq!(candidate.text(), r#"{"a": [1, 2"#);
        assert_eq!(candidate.source(), CandidateSource::FencedBlock);
    }

    #[test]
    fn test_extract_inline_fence() {
        let text = "```{\"a\": 1}```";
        let candidate = extract_candidate(text).unwrap();
        assert_eq!(candidate.text(), r#"{"a": 1}"#);
    }

    #[test]
    fn test_extract_embedded_object_is_greedy() {
        let text = r#"The answer is {"x": {"y": 2}} and that's it."#;
        let candidate = extract_candidate(text).unwrap();
        assert_eq!(candidate.text(), r#"{"x": {"y": 2}}"#);
    }

    #[test]
    fn test_extract_without_closing_brace() {
        let text = "  {\"summary\": \"ok\", \"issues\": [  ";
        let candidate = extract_candidate(text).unwrap();
        assert_eq!(candidate.text(), "{\"summary\": \"ok\", \"issues\": [");
        assert_eq!(candidate.source(), CandidateSource::Unterminated);
    }

    #[test]
    fn test_extract_no_json() {
        let text = "This is just plain text with no JSON at all.";
        let result = extract_candidate(text);
        assert!(matches!(result, Err(OutputParseError::NoJsonFound)));
    }

    #[test]
    fn test_extract_array_only_is_not_a_candidate() {
        assert!(extract_candidate("[1, 2, 3]").is_err());
    }

    #[test]
    fn test_parse_json_from_text() {
        let text = r#"```json
{"name": "Bob", "value": 200}
```"#;
        let result: TestStruct = parse_json_from_text(text).unwrap();
        assert_eq!(
            result,
            TestStruct {
                name: "Bob".into(),
                value: 200
            }
        );
    }

    #[test]
    fn test_parse_json_from_text_rejects_trailing_comma() {
        let result: ParseResult<TestStruct> =
            parse_json_from_text(r#"{"name": "Bob", "value": 200,}"#);
        assert!(matches!(result, Err(OutputParseError::JsonParse(_))));
    }

    #[test]
    fn test_parse_json_value() {
        let value = serde_json::json!({"name": "Charlie", "value": 300});
        let result: TestStruct = parse_json_value(&value).unwrap();
        assert_eq!(result.value, 300);
    }

    #[test]
    fn test_looks_like_json() {
        assert!(looks_like_json("{\"key\": \"value\"}"));
        assert!(looks_like_json("```json\n{}\n```"));
        assert!(looks_like_json("prefix {\"a\": 1}"));
        assert!(!looks_like_json("Just plain text"));
    }

    #[test]
    fn test_json_with_braces_in_strings() {
        let text = r#"{"code": "if (x) { return y; }", "valid": true}"#;
        let candidate = extract_candidate(text).unwrap();
        let parsed = candidate.parse().unwrap();
        assert_eq!(parsed["valid"], true);
    }
}
