//! OpenAI-compatible chat completions backend.
//!
//! Works against the OpenAI API and any server exposing the same
//! `POST /chat/completions` and `GET /models` endpoints.
//!
//! ## Example
//!
//! ```rust,ignore
//! use devlens_models::openai::OpenAiBackend;
//! use devlens_models::{Backend, GenerateOptions};
//!
//! let backend = OpenAiBackend::from_env("gpt-4o-mini")?;
//! let text = backend.generate("Say hi", &GenerateOptions::new()).await?;
//! ```

mod types;

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

use crate::backend::{Backend, StrategyHint};
use crate::error::{error_for_status, parse_retry_after, ModelError, ModelResult};
use crate::messages::{ChatMessage, ChatResponse, GenerateOptions, Role, ToolCall, ToolDefinition};
use types::{CompletionReply, CompletionRequest, FunctionTool, OutgoingMessage, ResponseFormat};

/// OpenAI-compatible backend.
#[derive(Debug, Clone)]
pub struct OpenAiBackend {
    model: String,
    client: Client,
    api_key: String,
    base_url: String,
    organization: Option<String>,
    temperature: Option<f64>,
    default_timeout: Duration,
}

impl OpenAiBackend {
    /// Default API base URL.
    pub const DEFAULT_BASE_URL: &'static str = "https://api.openai.com/v1";

    /// Model used when none is configured.
    pub const DEFAULT_MODEL: &'static str = "gpt-4o-mini";

    const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

    /// Create a new backend.
    pub fn new(model: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            client: Client::new(),
            api_key: api_key.into(),
            base_url: Self::DEFAULT_BASE_URL.to_string(),
            organization: None,
            temperature: None,
            default_timeout: Duration::from_secs(120),
        }
    }

    /// Create from environment variables `OPENAI_API_KEY` and, if set,
    /// `OPENAI_BASE_URL`.
    pub fn from_env(model: impl Into<String>) -> Result<Self, ModelError> {
        let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| {
            ModelError::Configuration("OPENAI_API_KEY environment variable not set".to_string())
        })?;
        let backend = Self::new(model, api_key);
        Ok(match std::env::var("OPENAI_BASE_URL") {
            Ok(url) if !url.trim().is_empty() => backend.with_base_url(url),
            _ => backend,
        })
    }

    /// Set the base URL.
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the organization ID.
    #[must_use]
    pub fn with_organization(mut self, org: impl Into<String>) -> Self {
        self.organization = Some(org.into());
        self
    }

    /// Set the default temperature.
    #[must_use]
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set a custom HTTP client.
    #[must_use]
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    /// Set the default timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// Base URL in use.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn authorized(&self, request: RequestBuilder, timeout: Duration) -> RequestBuilder {
        let request = request
            .header("Authorization", format!("Bearer {}", self.api_key))
            .timeout(timeout);
        match self.organization {
            Some(ref org) => request.header("OpenAI-Organization", org),
            None => request,
        }
    }

    async fn send<R: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        timeout: Duration,
    ) -> ModelResult<R> {
        let response = self
            .authorized(request, timeout)
            .send()
            .await
            .map_err(|e| ModelError::from_reqwest(e, timeout))?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let headers = response.headers().clone();
            let body = response.text().await.unwrap_or_default();
            return Err(Self::handle_error_response(status, body, &headers));
        }

        response
            .json()
            .await
            .map_err(|e| ModelError::invalid_response(e.to_string()))
    }

    fn handle_error_response(status: u16, body: String, headers: &HeaderMap) -> ModelError {
        let retry_after = parse_retry_after(headers);
        match serde_json::from_str::<types::ErrorEnvelope>(&body) {
            Ok(err) => match status {
                401 | 403 | 404 | 429 => error_for_status(status, err.error.message, retry_after),
                _ => ModelError::Api {
                    message: err.error.message,
                    code: err.error.code,
                },
            },
            Err(_) => error_for_status(status, body, retry_after),
        }
    }

    async fn complete(
        &self,
        body: &CompletionRequest<'_>,
        timeout: Duration,
    ) -> ModelResult<ChatResponse> {
        let request = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Content-Type", "application/json")
            .json(body);

        debug!(model = %self.model, messages = body.messages.len(), "OpenAI chat completion");
        let response: CompletionReply = self.send(request, timeout).await?;
        if let Some(ref usage) = response.usage {
            debug!(
                model = %response.model,
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "OpenAI usage"
            );
        }
        Self::parse_response(response)
    }

    fn parse_response(response: CompletionReply) -> ModelResult<ChatResponse> {
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ModelError::invalid_response("No choices in response"))?;

        if let Some(refusal) = choice.message.refusal.clone().filter(|r| !r.is_empty()) {
            return Err(ModelError::api_with_code(refusal, "refusal"));
        }

        let message = choice.message;
        let tool_calls = (!message.tool_calls.is_empty()).then(|| {
            message
                .tool_calls
                .into_iter()
                .map(|call| ToolCall {
                    id: Some(call.id),
                    name: call.function.name,
                    // Unparseable arguments are kept as the raw string
                    arguments: serde_json::from_str(&call.function.arguments)
                        .unwrap_or(serde_json::Value::String(call.function.arguments)),
                })
                .collect()
        });

        Ok(ChatResponse {
            content: message.content.unwrap_or_default(),
            tool_calls,
        })
    }
}

#[async_trait]
impl Backend for OpenAiBackend {
    fn name(&self) -> &str {
        "OpenAI"
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
        !self.api_key.trim().is_empty()
    }

    fn default_strategy(&self) -> StrategyHint {
        StrategyHint::SingleShot
    }

    async fn generate(&self, prompt: &str, options: &GenerateOptions) -> ModelResult<String> {
        let system = options.system.as_deref().map(|content| OutgoingMessage {
            role: Role::System,
            content,
        });
        let user = OutgoingMessage {
            role: Role::User,
            content: prompt,
        };

        let mut body = CompletionRequest::new(&self.model, system.into_iter().chain([user]).collect());
        body.temperature = options.temperature.or(self.temperature);
        if options.json {
            body.response_format = Some(ResponseFormat::JSON_OBJECT);
        }

        let timeout = options.timeout.unwrap_or(self.default_timeout);
        Ok(self.complete(&body, timeout).await?.content)
    }

    async fn chat(
        &self,
        messages: &[ChatMessage],
        tools: Option<&[ToolDefinition]>,
    ) -> ModelResult<ChatResponse> {
        let outgoing = messages
            .iter()
            .map(|m| OutgoingMessage {
                role: m.role,
                content: &m.content,
            })
            .collect();
        let mut body = CompletionRequest::new(&self.model, outgoing);
        body.temperature = self.temperature;
        body.tools = tools
            .unwrap_or_default()
            .iter()
            .map(FunctionTool::from)
            .collect();

        self.complete(&body, self.default_timeout).await
    }

    async fn list_models(&self) -> ModelResult<Vec<String>> {
        let request = self.client.get(format!("{}/models", self.base_url));
        let list: types::ModelList = self.send(request, self.default_timeout).await?;
        let mut ids: Vec<String> = list.data.into_iter().map(|m| m.id).collect();
        ids.sort();
        Ok(ids)
    }

    async fn is_available(&self) -> bool {
        if !self.is_configured() {
            return false;
        }
        let request = self.client.get(format!("{}/models", self.base_url));
        match self.send::<types::ModelList>(request, Self::PROBE_TIMEOUT).await {
            Ok(_) => true,
            Err(e) => {
                debug!(base_url = %self.base_url, error = %e, "OpenAI not reachable");
                false
            }
        }
    }
}
