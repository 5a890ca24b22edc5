//! Retry policy for determining what to retry.

/// Errors the retry executor can classify.
pub trait Retryable: std::fmt::Display {
    /// Whether another attempt may succeed.
    fn is_retryable(&self) -> bool;

    /// The error reported when the operation is cancelled before or during
    /// the given attempt. Cancellation is never retried.
    fn cancelled(attempt: u32) -> Self;
}
