//! Retry executor for running operations with retries.

use crate::config::RetryConfig;
use crate::policy::Retryable;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// State of a retry run.
#[derive(Debug)]
pub struct RetryState<E> {
    /// Last attempt number (1-indexed).
    pub attempt: u32,
    /// Total time spent waiting.
    pub total_wait_time: Duration,
    /// Attempts that completed, in order. The error that ends a failed run is
    /// returned in the result rather than recorded here.
    pub history: Vec<AttemptInfo<E>>,
}

impl<E> Default for RetryState<E> {
    fn default() -> Self {
        Self {
            attempt: 0,
            total_wait_time: Duration::ZERO,
            history: Vec::new(),
        }
    }
}

/// Information about a single attempt.
#[derive(Debug)]
pub struct AttemptInfo<E> {
    /// Attempt number.
    pub attempt: u32,
    /// Error if the attempt failed.
    pub error: Option<E>,
    /// Time waited after this attempt.
    pub wait_time: Duration,
}

impl<E> AttemptInfo<E> {
    /// Whether the attempt succeeded.
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Execute an operation with retries.
///
/// The operation receives the 1-indexed attempt number.
///
/// # Example
///
/// ```rust
/// use devlens_retries::{with_retry, RetryConfig, Retryable};
///
/// #[derive(Debug)]
/// struct Flaky;
///
/// impl std::fmt::Display for Flaky {
///     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
///         f.write_str("flaky")
///     }
/// }
///
/// impl Retryable for Flaky {
///     fn is_retryable(&self) -> bool {
///         true
///     }
///     fn cancelled(_attempt: u32) -> Self {
///         Flaky
///     }
/// }
///
/// # tokio_test::block_on(async {
/// let result = with_retry(&RetryConfig::immediate(), |attempt| async move {
///     if attempt < 2 { Err(Flaky) } else { Ok(attempt) }
/// })
/// .await;
/// assert_eq!(result.unwrap(), 2);
/// # });
/// ```
pub async fn with_retry<F, Fut, T, E>(config: &RetryConfig, operation: F) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Retryable,
{
    let (result, _) = with_retry_state(config, &CancellationToken::new(), operation).await;
    result
}

/// Execute an operation with retries, returning the attempt history.
///
/// Cancellation of `cancel` is checked before each attempt, raced against
/// the operation itself, and raced against the backoff sleep. It ends the run
/// with [`Retryable::cancelled`].
pub async fn with_retry_state<F, Fut, T, E>(
    config: &RetryConfig,
    cancel: &CancellationToken,
    mut operation: F,
) -> (Result<T, E>, RetryState<E>)
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Retryable,
{
    let mut state = RetryState::default();
    let max_attempts = config.attempt_limit();

    loop {
        state.attempt += 1;
        let attempt = state.attempt;

        debug!(attempt, max_attempts, "Executing retry attempt");

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(E::cancelled(attempt)),
            result = operation(attempt) => result,
        };

        match outcome {
            Ok(value) => {
                state.history.push(AttemptInfo {
                    attempt,
                    error: None,
                    wait_time: Duration::ZERO,
                });
                return (Ok(value), state);
            }
            Err(error) => {
                if attempt >= max_attempts || !error.is_retryable() || cancel.is_cancelled() {
                    warn!(attempt, error = %error, "Retry exhausted or error not retryable");
                    return (Err(error), state);
                }

                let wait = config.delay_after(attempt);
                debug!(
                    attempt,
                    wait_ms = wait.as_millis() as u64,
                    error = %error,
                    "Waiting before retry"
                );

                state.total_wait_time += wait;
                state.history.push(AttemptInfo {
                    attempt,
                    error: Some(error),
                    wait_time: wait,
                });

                let interrupted = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => true,
                    _ = sleep(wait) => false,
                };
                if interrupted {
                    let error = E::cancelled(attempt + 1);
                    warn!(attempt, error = %error, "Cancelled while waiting to retry");
                    return (Err(error), state);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[derive(Debug, PartialEq)]
    enum TestError {
        Transient(u32),
        Fatal,
        Cancelled(u32),
    }

    impl std::fmt::Display for TestError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{self:?}")
        }
    }

    impl Retryable for TestError {
        fn is_retryable(&self) -> bool {
            matches!(self, Self::Transient(_))
        }

        fn cancelled(attempt: u32) -> Self {
            Self::Cancelled(attempt)
        }
    }

    #[tokio::test]
    async fn test_success_first_try() {
        let (result, state) = with_retry_state(
            &RetryConfig::immediate(),
            &CancellationToken::new(),
            |_| async { Ok::<_, TestError>("ok") },
        )
        .await;
        assert_eq!(result.unwrap(), "ok");
        assert_eq!(state.attempt, 1);
        assert_eq!(state.history.len(), 1);
        assert!(state.history[0].succeeded());
    }

    #[tokio::test]
    async fn test_exhausts_max_attempts() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let (result, state) = with_retry_state(
            &RetryConfig::immediate().max_attempts(3),
            &CancellationToken::new(),
            move |attempt| {
                counter.fetch_add(1, Ordering::SeqCst);
                async move { Err::<(), _>(TestError::Transient(attempt)) }
            },
        )
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(result.unwrap_err(), TestError::Transient(3));
        assert_eq!(state.attempt, 3);
        let recorded: Vec<_> = state.history.iter().map(|a| a.attempt).collect();
        assert_eq!(recorded, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_fatal_error_stops_immediately() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let result = with_retry(&RetryConfig::immediate(), move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>(TestError::Fatal) }
        })
        .await;
        assert_eq!(result.unwrap_err(), TestError::Fatal);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_linear_wait_is_accumulated() {
        let (result, state) = with_retry_state(
            &RetryConfig::new(),
            &CancellationToken::new(),
            |attempt| async move {
                if attempt < 3 {
                    Err(TestError::Transient(attempt))
                } else {
                    Ok(attempt)
                }
            },
        )
        .await;
        assert_eq!(result.unwrap(), 3);
        assert_eq!(state.total_wait_time, Duration::from_secs(3));
        assert_eq!(state.history[0].wait_time, Duration::from_secs(1));
        assert_eq!(state.history[1].wait_time, Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let (result, _) = with_retry_state(&RetryConfig::immediate(), &cancel, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, TestError>(()) }
        })
        .await;
        assert_eq!(result.unwrap_err(), TestError::Cancelled(1));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_backoff_is_terminal() {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            sleep(Duration::from_millis(500)).await;
            trigger.cancel();
        });

        let (result, state) = with_retry_state(&RetryConfig::new(), &cancel, |attempt| async move {
            Err::<(), _>(TestError::Transient(attempt))
        })
        .await;
        assert_eq!(result.unwrap_err(), TestError::Cancelled(2));
        assert_eq!(state.attempt, 1);
        assert_eq!(state.history.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_operation() {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            sleep(Duration::from_millis(10)).await;
            trigger.cancel();
        });

        let (result, _) = with_retry_state(&RetryConfig::immediate(), &cancel, |_| async {
            sleep(Duration::from_secs(60)).await;
            Ok::<_, TestError>(())
        })
        .await;
        assert_eq!(result.unwrap_err(), TestError::Cancelled(1));
    }
}
