//! # devlens - Structured Output from Language Models
//!
//! devlens turns free-form model text into typed, schema-checked Rust
//! values. Models wrap JSON in prose and markdown fences, leave trailing
//! commas, drop closing braces and return `"85%"` where a number was asked
//! for. devlens recovers from all of that, and retries when it cannot.
//!
//! ## Quick Start
//!
//! ```ignore
//! use devlens::prelude::*;
//! use serde::Deserialize;
//!
//! #[derive(Deserialize)]
//! struct Verdict {
//!     approved: bool,
//!     score: u32,
//! }
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let generator = Generator::new(OllamaBackend::from_env());
//!     let schema = SchemaDescriptor::new()
//!         .field("approved", FieldKind::Boolean)
//!         .field("score", FieldKind::Number);
//!
//!     let verdict: Verdict = generator
//!         .generate_object(&GenerationRequest::new("Is this change safe?", schema))
//!         .await?;
//!     println!("approved: {}", verdict.approved);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Description | Default |
//! |---------|-------------|--------|
//! | `ollama` | Local Ollama models | ✅ |
//! | `openai` | OpenAI-compatible hosted models | ✅ |
//!
//! ## Architecture
//!
//! devlens is organized as a workspace of focused crates:
//!
//! - [`devlens_output`] - Extraction, repair, coercion and validation
//! - [`devlens_models`] - The backend trait and its implementations
//! - [`devlens_retries`] - Bounded retries with cancellation
//!
//! This crate ties them together in [`Generator`].
//!
//! ## Offline Use
//!
//! [`MockBackend`] replays scripted replies, so pipelines can be exercised
//! without a model:
//!
//! ```rust
//! use devlens::prelude::*;
//! use serde_json::Value;
//!
//! # tokio_test::block_on(async {
//! let backend = MockBackend::new().with_text("Sure! {\"approved\": \"yes\",}");
//! let generator = Generator::new(backend);
//! let schema = SchemaDescriptor::new().field("approved", FieldKind::Boolean);
//!
//! let value: Value = generator
//!     .generate_object(&GenerationRequest::new("Approve?", schema))
//!     .await
//!     .unwrap();
//! assert_eq!(value["approved"], true);
//! # });
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod attempt;
pub mod error;
pub mod generate;
pub mod prompt;
pub mod review;

// Crate re-exports
pub use devlens_models as models;
pub use devlens_output as output;
pub use devlens_retries as retries;

// Flat re-exports
pub use attempt::GenerationAttempt;
pub use error::{FailureCategory, GenerationError, GenerationFailure, GenerationResult};
pub use generate::{GenerationRequest, GenerationStrategy, Generator};
pub use prompt::frame_prompt;
pub use review::{review_code, CodeReview, Severity};

pub use devlens_models::{
    build_backend, Backend, BackendConfig, BackendKind, BoxedBackend, MockBackend, MockReply,
    ModelError, StrategyHint, UnavailableBackend,
};
pub use devlens_output::{
    FieldKind, ObjectSchema, OutputValidationError, OutputValidator, SchemaDescriptor,
    SyncValidator, ValidationIssue,
};
pub use devlens_retries::{CancellationToken, RetryConfig, WaitStrategy};

#[cfg(feature = "ollama")]
#[cfg_attr(docsrs, doc(cfg(feature = "ollama")))]
pub use devlens_models::OllamaBackend;

#[cfg(feature = "openai")]
#[cfg_attr(docsrs, doc(cfg(feature = "openai")))]
pub use devlens_models::OpenAiBackend;

/// Prelude for common imports.
pub mod prelude {
    pub use crate::{
        build_backend, Backend, BackendConfig, BackendKind, CancellationToken, FieldKind,
        GenerationError, GenerationRequest, GenerationStrategy, Generator, MockBackend,
        RetryConfig, SchemaDescriptor,
    };

    #[cfg(feature = "ollama")]
    pub use crate::OllamaBackend;

    #[cfg(feature = "openai")]
    pub use crate::OpenAiBackend;
}
