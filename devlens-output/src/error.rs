//! Error types for output extraction, repair and validation.

use std::fmt;
use thiserror::Error;

/// Error while turning model text into a JSON value.
#[derive(Debug, Error)]
pub enum OutputParseError {
    /// No JSON-like region (no `{`) was found in the output.
    #[error("No JSON object found in output")]
    NoJsonFound,

    /// The candidate still failed to parse after repair.
    #[error("Failed to parse JSON")]
    JsonParse(#[from] serde_json::Error),
}

impl OutputParseError {
    /// Whether this error came from the extraction stage.
    #[must_use]
    pub fn is_extraction(&self) -> bool {
        matches!(self, Self::NoJsonFound)
    }
}

/// A single mismatch between a value and its schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    /// JSON path of the offending value (`$.issues[2].severity`).
    pub path: String,
    /// What the schema expected at that path.
    pub expected: String,
    /// What was found instead.
    pub found: String,
}

impl ValidationIssue {
    /// Create a new issue.
    pub fn new(
        path: impl Into<String>,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            expected: expected.into(),
            found: found.into(),
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: expected {}, found {}", self.path, self.expected, self.found)
    }
}

/// Error during output validation.
#[derive(Debug, Error)]
pub enum OutputValidationError {
    /// The value does not match the schema descriptor.
    #[error("Schema validation failed: {}", join_issues(.issues))]
    Schema {
        /// Every mismatch found, in document order.
        issues: Vec<ValidationIssue>,
    },

    /// The value matched the descriptor but the target type rejected it.
    #[error("Failed to deserialize output")]
    Deserialize(#[from] serde_json::Error),
}

impl OutputValidationError {
    /// Create a schema error from a list of issues.
    pub fn schema(issues: Vec<ValidationIssue>) -> Self {
        Self::Schema { issues }
    }

    /// The issues carried by this error.
    ///
    /// Deserialization errors are reported as a single issue at the root.
    #[must_use]
    pub fn issues(&self) -> Vec<ValidationIssue> {
        match self {
            Self::Schema { issues } => issues.clone(),
            Self::Deserialize(e) => vec![ValidationIssue::new("$", "target type", e.to_string())],
        }
    }
}

fn join_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Result type for output parsing.
pub type ParseResult<T> = Result<T, OutputParseError>;

/// Result type for output validation.
pub type ValidationResult<T> = Result<T, OutputValidationError>;
