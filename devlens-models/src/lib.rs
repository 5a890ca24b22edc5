//! # devlens-models
//!
//! Language model backends for devlens.
//!
//! This crate provides the [`Backend`] trait and its implementations:
//!
//! - **Ollama**: local models (feature: `ollama`, default)
//! - **OpenAI**: OpenAI and compatible hosted APIs (feature: `openai`, default)
//! - **[`UnavailableBackend`]**: stand-in that rejects every call
//! - **[`MockBackend`]**: scripted replies for tests
//!
//! Use [`build_backend`] to turn a [`BackendConfig`] into a boxed backend.
//!
//! ## Example
//!
//! ```rust,ignore
//! use devlens_models::{build_backend, Backend, BackendConfig, BackendKind, GenerateOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let backend = build_backend(&BackendConfig::new(BackendKind::Ollama).with_model("llama3.1"));
//!     let text = backend.generate("Hello!", &GenerateOptions::new()).await?;
//!     println!("{text}");
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod backend;
pub mod config;
pub mod error;
pub mod messages;
pub mod mock;
pub mod unavailable;

/// Ollama local models.
#[cfg(feature = "ollama")]
#[cfg_attr(docsrs, doc(cfg(feature = "ollama")))]
pub mod ollama;

/// OpenAI-compatible hosted models.
#[cfg(feature = "openai")]
#[cfg_attr(docsrs, doc(cfg(feature = "openai")))]
pub mod openai;

// Re-exports
pub use backend::{Backend, BoxedBackend, StrategyHint};
pub use config::{build_backend, build_backend_with_env, BackendConfig, BackendKind};
pub use error::{ModelError, ModelResult};
pub use messages::{ChatMessage, ChatResponse, GenerateOptions, Role, ToolCall, ToolDefinition};
pub use mock::{MockBackend, MockReply};
pub use unavailable::UnavailableBackend;

#[cfg(feature = "ollama")]
pub use ollama::OllamaBackend;

#[cfg(feature = "openai")]
pub use openai::OpenAiBackend;

/// Prelude for common imports.
pub mod prelude {
    pub use crate::{
        build_backend, Backend, BackendConfig, BackendKind, ChatMessage, ChatResponse,
        GenerateOptions, ModelError, ModelResult,
    };
}
