//! Per-attempt records.

use devlens_output::RepairFix;
use devlens_retries::Retryable;
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::fmt;

use crate::error::{FailureCategory, GenerationFailure};

/// What happened during one generation attempt.
///
/// Fields are filled in as the pipeline progresses, so a record shows how far
/// the attempt got before it failed.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GenerationAttempt {
    /// Attempt number (1-indexed).
    pub attempt_number: u32,
    /// Text returned by the backend.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_output: Option<String>,
    /// Extracted (and possibly repaired) candidate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub candidate: Option<String>,
    /// Repairs applied to the candidate, in order.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub repairs: Vec<&'static str>,
    /// Value after coercion.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coerced_value: Option<JsonValue>,
    /// Failure category, if the attempt failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<&'static str>,
    /// Failure message, if the attempt failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl GenerationAttempt {
    /// Start a record for the given attempt.
    #[must_use]
    pub fn new(attempt_number: u32) -> Self {
        Self {
            attempt_number,
            ..Default::default()
        }
    }

    pub(crate) fn record_repairs(&mut self, repairs: &[RepairFix]) {
        self.repairs = repairs.iter().map(RepairFix::as_str).collect();
    }

    /// Whether the attempt failed.
    #[must_use]
    pub fn failed(&self) -> bool {
        self.error.is_some()
    }
}

/// A failed attempt: its record plus the typed cause.
#[derive(Debug)]
pub(crate) struct AttemptFailure {
    pub(crate) record: GenerationAttempt,
    pub(crate) failure: GenerationFailure,
}

impl AttemptFailure {
    pub(crate) fn new(mut record: GenerationAttempt, failure: GenerationFailure) -> Self {
        record.category = Some(failure.category().as_str());
        record.error = Some(failure.chain());
        Self { record, failure }
    }

    pub(crate) fn category(&self) -> FailureCategory {
        self.failure.category()
    }
}

impl fmt::Display for AttemptFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "attempt {}: {}", self.record.attempt_number, self.failure.chain())
    }
}

impl Retryable for AttemptFailure {
    fn is_retryable(&self) -> bool {
        self.failure.is_retryable()
    }

    fn cancelled(attempt: u32) -> Self {
        Self::new(GenerationAttempt::new(attempt), GenerationFailure::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use devlens_models::ModelError;

    #[test]
    fn test_failure_fills_record() {
        let failure = AttemptFailure::new(
            GenerationAttempt::new(2),
            GenerationFailure::Network(ModelError::network("reset")),
        );
        assert_eq!(failure.record.category, Some("network"));
        assert!(failure.record.failed());
        assert!(failure.is_retryable());
        assert_eq!(
            failure.to_string(),
            "attempt 2: Backend request failed: Network error: reset"
        );
        assert_eq!(
            failure.record.error.as_deref(),
            Some("Backend request failed: Network error: reset")
        );
    }

    #[test]
    fn test_cancelled_is_terminal() {
        let failure = AttemptFailure::cancelled(3);
        assert_eq!(failure.record.attempt_number, 3);
        assert_eq!(failure.category(), FailureCategory::Cancelled);
        assert!(!failure.is_retryable());
    }

    #[test]
    fn test_repairs_recorded_by_name() {
        let mut record = GenerationAttempt::new(1);
        record.record_repairs(&[RepairFix::StripComments, RepairFix::BalanceBrackets]);
        assert_eq!(record.repairs, vec!["strip_comments", "balance_brackets"]);
    }
}
