//! Stand-in for a backend that cannot be used.
//!
//! Built when configuration rules a backend out (no API key, backend
//! disabled, or support compiled out). Every call fails with
//! [`ModelError::Unavailable`] without touching the network.

use async_trait::async_trait;

use crate::backend::Backend;
use crate::error::{ModelError, ModelResult};
use crate::messages::{ChatMessage, ChatResponse, GenerateOptions, ToolDefinition};

/// A backend that rejects every call.
#[derive(Debug, Clone)]
pub struct UnavailableBackend {
    name: String,
    model: String,
    reason: Option<String>,
}

impl UnavailableBackend {
    /// Create a stub for the named backend.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            model: String::new(),
            reason: None,
        }
    }

    /// Record the configured model.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Record why the backend is unavailable.
    #[must_use]
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Why the backend is unavailable, if known.
    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    fn reject(&self) -> ModelError {
        ModelError::unavailable(self.name.clone())
    }
}

#[async_trait]
impl Backend for UnavailableBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn set_model(&mut self, model: &str) {
        self.model = model.to_string();
    }

    fn is_configured(&self) -> bool {
        false
    }

    async fn generate(&self, _prompt: &str, _options: &GenerateOptions) -> ModelResult<String> {
        Err(self.reject())
    }

    async fn chat(
        &self,
        _messages: &[ChatMessage],
        _tools: Option<&[ToolDefinition]>,
    ) -> ModelResult<ChatResponse> {
        Err(self.reject())
    }

    async fn list_models(&self) -> ModelResult<Vec<String>> {
        Err(self.reject())
    }

    async fn is_available(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_every_call_rejects() {
        let backend = UnavailableBackend::new("OpenAI")
            .with_model("gpt-4o-mini")
            .with_reason("OPENAI_API_KEY is not set");

        assert!(!backend.is_configured());
        assert!(!backend.is_available().await);
        assert_eq!(backend.reason(), Some("OPENAI_API_KEY is not set"));

        let err = backend
            .generate("hi", &GenerateOptions::new())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "OpenAI is not available");
        assert!(backend.chat(&[], None).await.is_err());
        assert!(backend.list_models().await.is_err());
    }
}
