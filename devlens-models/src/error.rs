//! Backend error types.
//!
//! Every backend reports failures as a [`ModelError`]. Transport failures are
//! classified when they are converted from `reqwest`, and non-success statuses
//! go through one mapping shared by all HTTP backends.

use std::time::Duration;
use thiserror::Error;

/// A failed backend call.
#[derive(Debug, Error)]
pub enum ModelError {
    /// Non-success status that has no more specific variant.
    #[error("HTTP {status}: {body}")]
    Http {
        /// Status code.
        status: u16,
        /// Response body, as sent.
        body: String,
    },

    /// The provider answered with a structured error or a refusal.
    #[error("Backend rejected the request: {message}")]
    Api {
        /// Provider message.
        message: String,
        /// Provider error code (`"invalid_api_key"`, `"refusal"`).
        code: Option<String>,
    },

    /// No response within the request timeout.
    #[error("No response within {0:?}")]
    Timeout(Duration),

    /// HTTP 429.
    #[error("Rate limited (retry after {retry_after:?})")]
    RateLimited {
        /// Delay from the `Retry-After` header.
        retry_after: Option<Duration>,
    },

    /// HTTP 401 or 403.
    #[error("Credentials rejected: {0}")]
    Authentication(String),

    /// The body could not be decoded or lacked the expected content.
    #[error("Unexpected response: {0}")]
    InvalidResponse(String),

    /// HTTP 404, usually an unknown model.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The call was cancelled before it completed.
    #[error("Request cancelled")]
    Cancelled,

    /// The server could not be reached.
    #[error("Connection error: {0}")]
    Connection(String),

    /// Settings are missing or invalid.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Any other transport failure.
    #[error("Network error: {0}")]
    Network(String),

    /// The backend is not usable in this configuration.
    #[error("{0} is not available")]
    Unavailable(String),
}

impl ModelError {
    /// Whether the transport reports a transient condition: timeouts, rate
    /// limits, lost connections and 5xx statuses.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout(_) | Self::RateLimited { .. } | Self::Connection(_) | Self::Network(_) => {
                true
            }
            Self::Http { status, .. } => (500..600).contains(status),
            _ => false,
        }
    }

    /// Whether the call was cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Server-suggested delay before the next call.
    #[must_use]
    pub fn retry_after(&self) -> Option<Duration> {
        if let Self::RateLimited { retry_after } = self {
            *retry_after
        } else {
            None
        }
    }

    /// Provider error without a code.
    pub fn api(message: impl Into<String>) -> Self {
        Self::Api {
            message: message.into(),
            code: None,
        }
    }

    /// Provider error with a code.
    pub fn api_with_code(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self::Api {
            message: message.into(),
            code: Some(code.into()),
        }
    }

    /// HTTP 429.
    pub fn rate_limited(retry_after: Option<Duration>) -> Self {
        Self::RateLimited { retry_after }
    }

    /// Non-success status.
    pub fn http(status: u16, body: impl Into<String>) -> Self {
        Self::Http {
            status,
            body: body.into(),
        }
    }

    /// Rejected credentials.
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Authentication(message.into())
    }

    /// Undecodable response.
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse(message.into())
    }

    /// Bad or missing settings.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Transport failure.
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }

    /// The named backend cannot be used.
    pub fn unavailable(backend: impl Into<String>) -> Self {
        Self::Unavailable(backend.into())
    }

    /// Classify a transport error, reporting timeouts with the limit that applied.
    pub fn from_reqwest(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            Self::Timeout(timeout)
        } else {
            err.into()
        }
    }
}

impl From<reqwest::Error> for ModelError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            // The applied limit is unknown here; see `from_reqwest`
            return Self::Timeout(Duration::ZERO);
        }
        if err.is_connect() {
            return Self::Connection(err.to_string());
        }
        match err.status() {
            Some(status) => error_for_status(status.as_u16(), err.to_string(), None),
            None if err.is_decode() => Self::InvalidResponse(err.to_string()),
            None => Self::Network(err.to_string()),
        }
    }
}

/// Map a non-success status and body to the closest error.
pub(crate) fn error_for_status(
    status: u16,
    body: String,
    retry_after: Option<Duration>,
) -> ModelError {
    match status {
        401 | 403 => ModelError::auth(body),
        404 => ModelError::NotFound(body),
        429 => ModelError::rate_limited(retry_after),
        _ => ModelError::http(status, body),
    }
}

/// Read a `Retry-After` header given in seconds.
pub(crate) fn parse_retry_after(headers: &reqwest::header::HeaderMap) -> Option<Duration> {
    headers
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

/// Result type for backend operations.
pub type ModelResult<T> = Result<T, ModelError>;

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(ModelError::Timeout(Duration::from_secs(30)), true)]
    #[case(ModelError::rate_limited(None), true)]
    #[case(ModelError::Connection("refused".into()), true)]
    #[case(ModelError::network("reset"), true)]
    #[case(ModelError::http(500, "boom"), true)]
    #[case(ModelError::http(503, "loading model"), true)]
    #[case(ModelError::http(400, "bad request"), false)]
    #[case(ModelError::auth("invalid key"), false)]
    #[case(ModelError::api("error"), false)]
    #[case(ModelError::Cancelled, false)]
    #[case(ModelError::unavailable("OpenAI"), false)]
    fn test_is_retryable(#[case] err: ModelError, #[case] retryable: bool) {
        assert_eq!(err.is_retryable(), retryable, "{err}");
    }

    #[test]
    fn test_error_for_status() {
        assert!(matches!(
            error_for_status(401, "no".into(), None),
            ModelError::Authentication(_)
        ));
        assert!(matches!(
            error_for_status(404, "missing".into(), None),
            ModelError::NotFound(_)
        ));
        let err = error_for_status(429, String::new(), Some(Duration::from_secs(7)));
        assert_eq!(err.retry_after(), Some(Duration::from_secs(7)));
        assert!(matches!(
            error_for_status(503, "busy".into(), None),
            ModelError::Http { status: 503, .. }
        ));
    }

    #[test]
    fn test_parse_retry_after() {
        let mut headers = reqwest::header::HeaderMap::new();
        assert_eq!(parse_retry_after(&headers), None);
        headers.insert(reqwest::header::RETRY_AFTER, "12".parse().unwrap());
        assert_eq!(parse_retry_after(&headers), Some(Duration::from_secs(12)));
        headers.insert(reqwest::header::RETRY_AFTER, "soon".parse().unwrap());
        assert_eq!(parse_retry_after(&headers), None);
    }

    #[test]
    fn test_error_display() {
        let err = ModelError::api_with_code("Something went wrong", "invalid_request");
        assert_eq!(err.to_string(), "Backend rejected the request: Something went wrong");
        assert_eq!(ModelError::http(404, "Not found").to_string(), "HTTP 404: Not found");
        assert_eq!(ModelError::unavailable("OpenAI").to_string(), "OpenAI is not available");
    }
}
