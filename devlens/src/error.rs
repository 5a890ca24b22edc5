//! Generation error types.

use devlens_models::ModelError;
use devlens_output::{OutputParseError, OutputValidationError};
use std::fmt;
use thiserror::Error;

use crate::attempt::GenerationAttempt;

/// Which pipeline stage an attempt failed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureCategory {
    /// The backend call failed.
    Network,
    /// No JSON object in the model output.
    Extraction,
    /// The candidate did not parse.
    Repair,
    /// Coercion failed.
    Coercion,
    /// The value did not satisfy the schema or the target type.
    Validation,
    /// The call was cancelled or timed out.
    Cancelled,
}

impl FailureCategory {
    /// Lowercase name used in logs.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Extraction => "extraction",
            Self::Repair => "repair",
            Self::Coercion => "coercion",
            Self::Validation => "validation",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for FailureCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a single attempt failed.
#[derive(Debug, Error)]
pub enum GenerationFailure {
    /// The backend call failed.
    #[error("Backend request failed")]
    Network(#[source] ModelError),

    /// No JSON object in the model output.
    #[error("No JSON object found in model output")]
    Extraction(#[source] OutputParseError),

    /// The candidate did not parse, after repair when the strategy repairs.
    #[error("Model output is not valid JSON")]
    Repair(#[source] OutputParseError),

    /// Coercion failed. Coercion is total, so this is not produced by the
    /// built-in pipeline.
    #[error("Failed to coerce output: {0}")]
    Coercion(String),

    /// The value did not satisfy the schema or the target type.
    #[error("Output failed validation")]
    Validation(#[source] OutputValidationError),

    /// The call was cancelled or timed out.
    #[error("Generation cancelled")]
    Cancelled,
}

impl GenerationFailure {
    /// The failure category.
    #[must_use]
    pub fn category(&self) -> FailureCategory {
        match self {
            Self::Network(e) if e.is_cancelled() => FailureCategory::Cancelled,
            Self::Network(_) => FailureCategory::Network,
            Self::Extraction(_) => FailureCategory::Extraction,
            Self::Repair(_) => FailureCategory::Repair,
            Self::Coercion(_) => FailureCategory::Coercion,
            Self::Validation(_) => FailureCategory::Validation,
            Self::Cancelled => FailureCategory::Cancelled,
        }
    }

    /// Every failure except cancellation may succeed on another attempt.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.category() != FailureCategory::Cancelled
    }

    /// This failure followed by each underlying cause, joined with `": "`.
    #[must_use]
    pub fn chain(&self) -> String {
        let mut out = self.to_string();
        let mut cause = std::error::Error::source(self);
        while let Some(err) = cause {
            out.push_str(": ");
            out.push_str(&err.to_string());
            cause = err.source();
        }
        out
    }
}

impl From<ModelError> for GenerationFailure {
    fn from(err: ModelError) -> Self {
        Self::Network(err)
    }
}

impl From<OutputValidationError> for GenerationFailure {
    fn from(err: OutputValidationError) -> Self {
        Self::Validation(err)
    }
}

impl From<OutputParseError> for GenerationFailure {
    fn from(err: OutputParseError) -> Self {
        if err.is_extraction() {
            Self::Extraction(err)
        } else {
            Self::Repair(err)
        }
    }
}

/// Error returned by [`Generator::generate_object`](crate::Generator::generate_object).
#[derive(Debug, Error)]
pub enum GenerationError {
    /// Every allowed attempt failed. `source` is the last attempt's cause.
    #[error("Failed to generate structured object with {backend}")]
    Failed {
        /// Backend display name.
        backend: String,
        /// Every attempt made, in order.
        attempts: Vec<GenerationAttempt>,
        /// Cause of the last attempt's failure.
        #[source]
        source: GenerationFailure,
    },

    /// The backend is not configured; nothing was attempted.
    #[error("{backend} is not available")]
    Unavailable {
        /// Backend display name.
        backend: String,
    },
}

impl GenerationError {
    /// Create an unavailable error.
    pub fn unavailable(backend: impl Into<String>) -> Self {
        Self::Unavailable {
            backend: backend.into(),
        }
    }

    /// The last attempt's failure, if any attempt was made.
    #[must_use]
    pub fn failure(&self) -> Option<&GenerationFailure> {
        match self {
            Self::Failed { source, .. } => Some(source),
            Self::Unavailable { .. } => None,
        }
    }

    /// Category of the last failure.
    #[must_use]
    pub fn category(&self) -> Option<FailureCategory> {
        self.failure().map(GenerationFailure::category)
    }

    /// Attempt history.
    #[must_use]
    pub fn attempts(&self) -> &[GenerationAttempt] {
        match self {
            Self::Failed { attempts, .. } => attempts,
            Self::Unavailable { .. } => &[],
        }
    }

    /// Whether generation stopped because of cancellation or timeout.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.category() == Some(FailureCategory::Cancelled)
    }
}

/// Result type for generation.
pub type GenerationResult<T> = Result<T, GenerationError>;
