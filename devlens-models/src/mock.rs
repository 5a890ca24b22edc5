//! Scripted backend for testing.
//!
//! [`MockBackend`] replays a queue of replies in order, then falls back to a
//! fixed reply if one is set. Clones share the queue and the call record, so
//! a test can keep a handle after moving the backend into a generator.
//!
//! ```rust
//! use devlens_models::{Backend, GenerateOptions, MockBackend, ModelError};
//!
//! # tokio_test::block_on(async {
//! let backend = MockBackend::new()
//!     .with_text("not json")
//!     .with_error(|| ModelError::Connection("refused".into()))
//!     .with_fallback_text("{\"ok\": true}");
//!
//! let options = GenerateOptions::new();
//! assert_eq!(backend.generate("a", &options).await.unwrap(), "not json");
//! assert!(backend.generate("b", &options).await.is_err());
//! assert_eq!(backend.generate("c", &options).await.unwrap(), "{\"ok\": true}");
//! assert_eq!(backend.calls(), 3);
//! # });
//! ```

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use crate::backend::{Backend, StrategyHint};
use crate::error::{ModelError, ModelResult};
use crate::messages::{ChatMessage, ChatResponse, GenerateOptions, ToolDefinition};

/// One scripted reply.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Return this text.
    Text(String),
    /// Fail with the error this builds.
    Error(fn() -> ModelError),
}

impl MockReply {
    fn resolve(self) -> ModelResult<String> {
        match self {
            Self::Text(text) => Ok(text),
            Self::Error(make) => Err(make()),
        }
    }
}

/// A backend with scripted replies.
#[derive(Debug, Clone)]
pub struct MockBackend {
    name: String,
    model: String,
    temperature: Option<f64>,
    strategy: StrategyHint,
    configured: bool,
    available: bool,
    models: Vec<String>,
    delay: Option<Duration>,
    fallback: Option<MockReply>,
    script: Arc<Mutex<VecDeque<MockReply>>>,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    /// Create an empty mock named `"Mock"`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            name: "Mock".to_string(),
            model: "mock-model".to_string(),
            temperature: None,
            strategy: StrategyHint::Retrying,
            configured: true,
            available: true,
            models: vec!["mock-model".to_string()],
            delay: None,
            fallback: None,
            script: Arc::new(Mutex::new(VecDeque::new())),
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Set the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the default strategy the mock reports.
    #[must_use]
    pub fn with_strategy(mut self, strategy: StrategyHint) -> Self {
        self.strategy = strategy;
        self
    }

    /// Queue a text reply.
    #[must_use]
    pub fn with_text(self, text: impl Into<String>) -> Self {
        self.script.lock().push_back(MockReply::Text(text.into()));
        self
    }

    /// Queue an error reply.
    #[must_use]
    pub fn with_error(self, make: fn() -> ModelError) -> Self {
        self.script.lock().push_back(MockReply::Error(make));
        self
    }

    /// Reply with this text once the queue is empty.
    #[must_use]
    pub fn with_fallback_text(mut self, text: impl Into<String>) -> Self {
        self.fallback = Some(MockReply::Text(text.into()));
        self
    }

    /// Fail with this error once the queue is empty.
    #[must_use]
    pub fn with_fallback_error(mut self, make: fn() -> ModelError) -> Self {
        self.fallback = Some(MockReply::Error(make));
        self
    }

    /// Wait this long before every reply.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Set the models reported by [`Backend::list_models`].
    #[must_use]
    pub fn with_models<I, S>(mut self, models: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.models = models.into_iter().map(Into::into).collect();
        self
    }

    /// Report the backend as unreachable.
    #[must_use]
    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }

    /// Report the backend as unconfigured.
    #[must_use]
    pub fn unconfigured(mut self) -> Self {
        self.configured = false;
        self
    }

    /// Number of generate/chat calls so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.prompts.lock().len()
    }

    /// Prompts received so far, in order.
    #[must_use]
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }

    async fn reply(&self, prompt: String) -> ModelResult<String> {
        self.prompts.lock().push(prompt);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let next = self.script.lock().pop_front();
        match next.or_else(|| self.fallback.clone()) {
            Some(reply) => reply.resolve(),
            None => Err(ModelError::invalid_response(
                "mock backend has no scripted reply",
            )),
        }
    }
}

#[async_trait]
impl Backend for MockBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn set_model(&mut self, model: &str) {
        self.model = model.to_string();
    }

    fn temperature(&self) -> Option<f64> {
        self.temperature
    }

    fn set_temperature(&mut self, temperature: Option<f64>) {
        self.temperature = temperature;
    }

    fn is_configured(&self) -> bool {
        self.configured
    }

    fn default_strategy(&self) -> StrategyHint {
        self.strategy
    }

    async fn generate(&self, prompt: &str, _options: &GenerateOptions) -> ModelResult<String> {
        self.reply(prompt.to_string()).await
    }

    async fn chat(
        &self,
        messages: &[ChatMessage],
        _tools: Option<&[ToolDefinition]>,
    ) -> ModelResult<ChatResponse> {
        let prompt = messages
            .last()
            .map(|m| m.content.clone())
            .unwrap_or_default();
        self.reply(prompt).await.map(ChatResponse::text)
    }

    async fn list_models(&self) -> ModelResult<Vec<String>> {
        Ok(self.models.clone())
    }

    async fn is_available(&self) -> bool {
        self.available
    }
}
