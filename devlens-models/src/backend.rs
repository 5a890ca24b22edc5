//! Core backend trait.
//!
//! This module defines the [`Backend`] trait, the interface the generator
//! uses to talk to a language model server.

use async_trait::async_trait;

use crate::error::ModelResult;
use crate::messages::{ChatMessage, ChatResponse, GenerateOptions, ToolDefinition};

/// How a backend prefers structured output to be produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StrategyHint {
    /// Full recovery pipeline with bounded retries.
    #[default]
    Retrying,
    /// One call, strict parse, no repair.
    SingleShot,
}

/// A language model backend.
///
/// Implementations hold only connection settings and the current model and
/// temperature; nothing else persists across calls.
#[async_trait]
pub trait Backend: Send + Sync + std::fmt::Debug {
    /// Display name, used in error messages (`"Ollama"`, `"OpenAI"`).
    fn name(&self) -> &str;

    /// Current model name.
    fn model(&self) -> &str;

    /// Switch to another model.
    fn set_model(&mut self, model: &str);

    /// Configured default temperature.
    fn temperature(&self) -> Option<f64> {
        None
    }

    /// Change the default temperature.
    fn set_temperature(&mut self, _temperature: Option<f64>) {}

    /// Whether the backend can be called at all. An unconfigured backend
    /// rejects generation without doing any work.
    fn is_configured(&self) -> bool {
        true
    }

    /// The generation strategy this backend defaults to.
    fn default_strategy(&self) -> StrategyHint {
        StrategyHint::Retrying
    }

    /// Complete a single prompt.
    async fn generate(&self, prompt: &str, options: &GenerateOptions) -> ModelResult<String>;

    /// Run a chat exchange, optionally offering tools.
    async fn chat(
        &self,
        messages: &[ChatMessage],
        tools: Option<&[ToolDefinition]>,
    ) -> ModelResult<ChatResponse>;

    /// List the models the server offers.
    async fn list_models(&self) -> ModelResult<Vec<String>>;

    /// Probe the server. Never fails; unreachable means `false`.
    async fn is_available(&self) -> bool;
}

/// Boxed backend for dynamic dispatch.
pub type BoxedBackend = Box<dyn Backend>;
