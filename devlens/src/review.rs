//! Code-review verdicts.
//!
//! A [`CodeReview`] is the structured verdict devlens asks a model for when
//! reviewing a change. [`review_code`] builds the prompt, runs it through a
//! [`Generator`] and checks the score range.
//!
//! ```rust
//! use devlens::review::{review_code, Severity};
//! use devlens::{Generator, MockBackend, RetryConfig};
//!
//! # tokio_test::block_on(async {
//! let backend = MockBackend::new().with_text(
//!     "```json\n{\"summary\": \"Small fix\", \"score\": \"90%\", \"approved\": \"yes\", \"severity\": \"LOW\"}\n```",
//! );
//! let generator = Generator::new(backend).with_retry(RetryConfig::immediate());
//!
//! let review = review_code(&generator, "fn main() {}", None).await.unwrap();
//! assert_eq!(review.score, 90);
//! assert_eq!(review.severity, Severity::Low);
//! assert!(review.issues.is_empty());
//! # });
//! ```

use devlens_output::{
    FieldKind, OutputValidationError, SchemaDescriptor, SyncValidator, ValidationIssue,
};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::GenerationResult;
use crate::generate::{GenerationRequest, Generator};

/// Highest severity among the findings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Cosmetic.
    Low,
    /// Should be fixed.
    Medium,
    /// Must be fixed before merging.
    High,
    /// Security or data-loss risk.
    Critical,
}

impl Severity {
    /// All members, in ascending order.
    pub const ALL: [Severity; 4] = [Self::Low, Self::Medium, Self::High, Self::Critical];

    /// Lowercase name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A code-review verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeReview {
    /// One-paragraph summary.
    pub summary: String,
    /// Quality score, 0 to 100.
    pub score: u32,
    /// Whether the change can be merged as is.
    pub approved: bool,
    /// Highest severity among the issues.
    pub severity: Severity,
    /// Problems found.
    pub issues: Vec<String>,
    /// Suggested improvements.
    pub suggestions: Vec<String>,
}

/// Schema of [`CodeReview`].
#[must_use]
pub fn review_schema() -> SchemaDescriptor {
    SchemaDescriptor::new()
        .with_field(
            "summary",
            FieldKind::String,
            true,
            Some("One-paragraph summary of the change"),
        )
        .with_field(
            "score",
            FieldKind::Number,
            true,
            Some("Quality score from 0 to 100"),
        )
        .with_field(
            "approved",
            FieldKind::Boolean,
            true,
            Some("Whether the change can be merged as is"),
        )
        .with_field(
            "severity",
            FieldKind::enumeration(Severity::ALL.iter().map(Severity::as_str)),
            true,
            Some("Highest severity among the issues"),
        )
        .with_field(
            "issues",
            FieldKind::array(FieldKind::String),
            true,
            Some("Problems found, most important first"),
        )
        .with_field(
            "suggestions",
            FieldKind::array(FieldKind::String),
            true,
            Some("Concrete improvements"),
        )
}

/// Prompt asking for a review of `code`.
#[must_use]
pub fn review_prompt(code: &str, context: Option<&str>) -> String {
    let mut prompt = String::from(
        "You are a senior engineer reviewing a change. Assess correctness, \
         security and maintainability.\n",
    );
    if let Some(context) = context.filter(|c| !c.trim().is_empty()) {
        prompt.push_str("\nContext:\n");
        prompt.push_str(context.trim());
        prompt.push('\n');
    }
    prompt.push_str("\nCode:\n```\n");
    prompt.push_str(code.trim_end());
    prompt.push_str("\n```");
    prompt
}

/// Review `code` with the generator's backend.
pub async fn review_code(
    generator: &Generator,
    code: &str,
    context: Option<&str>,
) -> GenerationResult<CodeReview> {
    let request = GenerationRequest::new(review_prompt(code, context), review_schema());
    let validator = SyncValidator::new(|review: CodeReview| {
        if review.score > 100 {
            return Err(OutputValidationError::schema(vec![ValidationIssue::new(
                "$.score",
                "number from 0 to 100",
                review.score.to_string(),
            )]));
        }
        Ok(review)
    });
    generator
        .generate_object_validated(&request, &validator)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureCategory;
    use devlens_models::MockBackend;
    use devlens_retries::RetryConfig;
    use pretty_assertions::assert_eq;

    fn generator(backend: &MockBackend) -> Generator {
        Generator::new(backend.clone()).with_retry(RetryConfig::immediate())
    }

    #[tokio::test]
    async fn test_review_from_messy_output() {
        let backend = MockBackend::new().with_text(
            "Here's my review:\n```json\n{\n  \"Summary\": \"Adds caching\",\n  \"score\": \"75.5%\",\n  \"approved\": \"no\",\n  \"severity\": \"High\",\n  \"issues\": [\"cache never expires\"],\n}\n```",
        );
        let review = review_code(&generator(&backend), "let x = 1;", Some("PR #12"))
            .await
            .unwrap();
        assert_eq!(
            review,
            CodeReview {
                summary: "Adds caching".into(),
                score: 76,
                approved: false,
                severity: Severity::High,
                issues: vec!["cache never expires".into()],
                suggestions: vec![],
            }
        );
        let prompt = &backend.prompts()[0];
        assert!(prompt.contains("PR #12"));
        assert!(prompt.contains("let x = 1;"));
    }

    #[tokio::test]
    async fn test_out_of_range_score_is_retried() {
        let backend = MockBackend::new()
            .with_text(
                "{\"summary\": \"x\", \"score\": 180, \"approved\": true, \"severity\": \"low\"}",
            )
            .with_text("{\"summary\": \"x\", \"score\": 80, \"approved\": true, \"severity\": \"low\"}");
        let review = review_code(&generator(&backend), "x", None).await.unwrap();
        assert_eq!(review.score, 80);
        assert_eq!(backend.calls(), 2);
    }

    #[tokio::test]
    async fn test_unknown_severity_fails_validation() {
        let backend = MockBackend::new().with_fallback_text(
            "{\"summary\": \"x\", \"score\": 10, \"approved\": false, \"severity\": \"blocker\"}",
        );
        let err = review_code(&generator(&backend), "x", None)
            .await
            .unwrap_err();
        assert_eq!(err.category(), Some(FailureCategory::Validation));
        assert_eq!(err.attempts().len(), 3);
    }

    #[test]
    fn test_schema_lists_severities() {
        let schema = review_schema().to_json_schema();
        assert_eq!(
            schema["properties"]["severity"]["enum"],
            serde_json::json!(["low", "medium", "high", "critical"])
        );
        assert_eq!(schema["required"].as_array().unwrap().len(), 6);
    }

    #[test]
    fn test_review_prompt_without_context() {
        let prompt = review_prompt("fn a() {}\n\n", Some("  "));
        assert!(!prompt.contains("Context:"));
        assert!(prompt.ends_with("fn a() {}\n```"));
    }
}
