//! # devlens-retries
//!
//! Bounded retry loop for devlens.
//!
//! ## Core Concepts
//!
//! - **[`RetryConfig`]**: attempt limit and wait strategy
//! - **[`WaitStrategy`]**: how long to wait between attempts
//! - **[`Retryable`]**: which errors are worth another attempt
//! - **[`with_retry_state`]**: run an operation, keeping every attempt's outcome
//!
//! ## Wait Strategies
//!
//! - [`WaitStrategy::None`]: retry immediately
//! - [`WaitStrategy::Fixed`]: constant delay between attempts
//! - [`WaitStrategy::Linear`]: `attempt * base`, the default at 1s
//! - [`WaitStrategy::ExponentialBackoff`]: exponential delay with cap

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod config;
pub mod executor;
pub mod policy;

pub use config::{RetryConfig, WaitStrategy};
pub use executor::{with_retry, with_retry_state, AttemptInfo, RetryState};
pub use policy::Retryable;
pub use tokio_util::sync::CancellationToken;

/// Prelude for common imports.
pub mod prelude {
    pub use crate::{with_retry, with_retry_state, RetryConfig, Retryable, WaitStrategy};
}
