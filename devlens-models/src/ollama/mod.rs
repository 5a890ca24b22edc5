//! Ollama backend for local models.
//!
//! [Ollama](https://ollama.ai) runs models locally. This backend talks to its
//! HTTP API: `POST /api/generate`, `POST /api/chat` and `GET /api/tags`.
//!
//! ## Example
//!
//! ```ignore
//! use devlens_models::ollama::OllamaBackend;
//!
//! // Connect to local Ollama
//! let backend = OllamaBackend::new("llama3.1");
//!
//! // Custom host
//! let backend = OllamaBackend::new("codellama")
//!     .with_base_url("http://192.168.1.100:11434");
//! ```

mod types;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

use crate::backend::{Backend, StrategyHint};
use crate::error::{error_for_status, parse_retry_after, ModelError, ModelResult};
use crate::messages::{ChatMessage, ChatResponse, GenerateOptions, ToolCall, ToolDefinition};

/// Ollama backend.
#[derive(Debug, Clone)]
pub struct OllamaBackend {
    model: String,
    client: Client,
    base_url: String,
    temperature: Option<f64>,
    /// How long Ollama keeps the model loaded after a request (`"5m"`).
    keep_alive: Option<String>,
    default_timeout: Duration,
}

impl OllamaBackend {
    /// Default Ollama base URL.
    pub const DEFAULT_BASE_URL: &'static str = "http://localhost:11434";

    /// Model used when none is configured.
    pub const DEFAULT_MODEL: &'static str = "llama3.1";

    /// Timeout for the availability probe.
    const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

    /// Create a new Ollama backend.
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            client: Client::new(),
            base_url: Self::DEFAULT_BASE_URL.to_string(),
            temperature: None,
            keep_alive: None,
            default_timeout: Duration::from_secs(300),
        }
    }

    /// Create from environment variable `OLLAMA_HOST`.
    pub fn from_env(model: impl Into<String>) -> Result<Self, ModelError> {
        let base_url =
            std::env::var("OLLAMA_HOST").unwrap_or_else(|_| Self::DEFAULT_BASE_URL.to_string());
        Ok(Self::new(model).with_base_url(base_url))
    }

    /// Set custom base URL.
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the default timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// Set the default temperature.
    #[must_use]
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set keep alive duration (e.g., "5m", "1h").
    #[must_use]
    pub fn with_keep_alive(mut self, duration: impl Into<String>) -> Self {
        self.keep_alive = Some(duration.into());
        self
    }

    /// Set a custom HTTP client.
    #[must_use]
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    /// Base URL in use.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn sampling(&self, temperature: Option<f64>) -> Option<types::SamplingOptions> {
        temperature
            .or(self.temperature)
            .map(|temperature| types::SamplingOptions { temperature })
    }

    async fn post_json<B, R>(&self, path: &str, body: &B, timeout: Duration) -> ModelResult<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let response = self
            .client
            .post(self.url(path))
            .header("Content-Type", "application/json")
            .timeout(timeout)
            .json(body)
            .send()
            .await
            .map_err(|e| ModelError::from_reqwest(e, timeout))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let retry_after = parse_retry_after(response.headers());
            let text = response.text().await.unwrap_or_default();
            return Err(error_for_status(status, text, retry_after));
        }

        response
            .json()
            .await
            .map_err(|e| ModelError::invalid_response(e.to_string()))
    }

    async fn fetch_tags(&self, timeout: Duration) -> ModelResult<types::TagsReply> {
        let response = self
            .client
            .get(self.url("/api/tags"))
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| ModelError::from_reqwest(e, timeout))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let text = response.text().await.unwrap_or_default();
            return Err(error_for_status(status, text, None));
        }

        response
            .json()
            .await
            .map_err(|e| ModelError::invalid_response(e.to_string()))
    }

    /// Ollama does not id its tool calls; they are numbered in reply order.
    fn parse_chat(reply: types::ChatReply) -> ChatResponse {
        let message = reply.message;
        let tool_calls = (!message.tool_calls.is_empty()).then(|| {
            message
                .tool_calls
                .into_iter()
                .enumerate()
                .map(|(idx, call)| ToolCall {
                    id: Some(format!("call_{idx}")),
                    name: call.function.name,
                    arguments: call.function.arguments,
                })
                .collect()
        });

        ChatResponse {
            content: message.content,
            tool_calls,
        }
    }
}

#[async_trait]
impl Backend for OllamaBackend {
    fn name(&self) -> &str {
        "Ollama"
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

    fn default_strategy(&self) -> StrategyHint {
        StrategyHint::Retrying
    }

    async fn generate(&self, prompt: &str, options: &GenerateOptions) -> ModelResult<String> {
        let timeout = options.timeout.unwrap_or(self.default_timeout);
        let body = types::GenerateRequest {
            model: &self.model,
            prompt,
            system: options.system.as_deref(),
            stream: false,
            options: self.sampling(options.temperature),
            keep_alive: self.keep_alive.as_deref(),
            format: options.json.then_some("json"),
        };

        debug!(model = %self.model, prompt_len = prompt.len(), "Ollama generate");
        let reply: types::GenerateReply = self.post_json("/api/generate", &body, timeout).await?;
        debug!(
            model = %self.model,
            eval_count = reply.eval_count,
            "Ollama generate complete"
        );
        Ok(reply.response)
    }

    async fn chat(
        &self,
        messages: &[ChatMessage],
        tools: Option<&[ToolDefinition]>,
    ) -> ModelResult<ChatResponse> {
        let body = types::ChatRequest {
            model: &self.model,
            messages: messages
                .iter()
                .map(|m| types::OutgoingMessage {
                    role: m.role,
                    content: &m.content,
                })
                .collect(),
            tools: tools
                .unwrap_or_default()
                .iter()
                .map(types::FunctionTool::from)
                .collect(),
            stream: false,
            options: self.sampling(None),
            keep_alive: self.keep_alive.as_deref(),
        };

        debug!(model = %self.model, messages = messages.len(), "Ollama chat");
        let reply: types::ChatReply =
            self.post_json("/api/chat", &body, self.default_timeout).await?;
        Ok(Self::parse_chat(reply))
    }

    async fn list_models(&self) -> ModelResult<Vec<String>> {
        let tags = self.fetch_tags(self.default_timeout).await?;
        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    async fn is_available(&self) -> bool {
        match self.fetch_tags(Self::PROBE_TIMEOUT).await {
            Ok(_) => true,
            Err(e) => {
                debug!(base_url = %self.base_url, error = %e, "Ollama not reachable");
                false
            }
        }
    }
}
