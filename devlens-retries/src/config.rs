//! Retry configuration.

use std::time::Duration;

/// Configuration for retry behavior.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first. Values below 1 are
    /// treated as 1.
    pub max_attempts: u32,
    /// Wait strategy between attempts.
    pub wait: WaitStrategy,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            wait: WaitStrategy::Linear {
                base: Duration::from_secs(1),
            },
        }
    }
}

impl RetryConfig {
    /// Create a new default config: 3 attempts, 1s linear backoff.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set max attempts.
    #[must_use]
    pub fn max_attempts(mut self, n: u32) -> Self {
        self.max_attempts = n;
        self
    }

    /// Set the wait strategy.
    #[must_use]
    pub fn wait(mut self, strategy: WaitStrategy) -> Self {
        self.wait = strategy;
        self
    }

    /// Use fixed delay.
    #[must_use]
    pub fn fixed(mut self, delay: Duration) -> Self {
        self.wait = WaitStrategy::Fixed(delay);
        self
    }

    /// Use linear backoff: attempt `n` is followed by `n * base`.
    #[must_use]
    pub fn linear(mut self, base: Duration) -> Self {
        self.wait = WaitStrategy::Linear { base };
        self
    }

    /// Use exponential backoff.
    #[must_use]
    pub fn exponential(mut self, initial: Duration, max: Duration) -> Self {
        self.wait = WaitStrategy::ExponentialBackoff {
            initial,
            max,
            multiplier: 2.0,
        };
        self
    }

    /// Do not wait between attempts.
    #[must_use]
    pub fn no_wait(mut self) -> Self {
        self.wait = WaitStrategy::None;
        self
    }

    /// Default attempt count with no waiting. Useful in tests.
    #[must_use]
    pub fn immediate() -> Self {
        Self::new().no_wait()
    }

    /// Config that never retries.
    #[must_use]
    pub fn no_retry() -> Self {
        Self::new().max_attempts(1)
    }

    /// Effective attempt limit.
    #[must_use]
    pub fn attempt_limit(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Delay to wait after the given failed attempt (1-indexed).
    #[must_use]
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.wait.calculate(attempt)
    }
}

/// Strategy for waiting between retries.
#[derive(Debug, Clone, PartialEq)]
pub enum WaitStrategy {
    /// No waiting.
    None,
    /// Fixed delay.
    Fixed(Duration),
    /// Delay grows by `base` with every failed attempt.
    Linear {
        /// Delay after the first failure.
        base: Duration,
    },
    /// Exponential backoff.
    ExponentialBackoff {
        /// Initial delay.
        initial: Duration,
        /// Maximum delay.
        max: Duration,
        /// Multiplier for each attempt.
        multiplier: f64,
    },
}

impl WaitStrategy {
    /// Calculate the wait duration after a given attempt.
    #[must_use]
    pub fn calculate(&self, attempt: u32) -> Duration {
        match self {
            WaitStrategy::None => Duration::ZERO,
            WaitStrategy::Fixed(d) => *d,
            WaitStrategy::Linear { base } => base.saturating_mul(attempt),
            WaitStrategy::ExponentialBackoff {
                initial,
                max,
                multiplier,
            } => {
                let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
                let delay = initial.as_secs_f64() * multiplier.powi(exponent);
                if delay.is_finite() {
                    Duration::from_secs_f64(delay.min(max.as_secs_f64()))
                } else {
                    *max
                }
            }
        }
    }
}
