//! Backend selection from configuration.
//!
//! ```rust
//! use devlens_models::{build_backend, BackendConfig, BackendKind};
//!
//! let config = BackendConfig::new(BackendKind::None);
//! let backend = build_backend(&config);
//! assert!(!backend.is_configured());
//! ```

use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

use crate::backend::BoxedBackend;
use crate::error::ModelError;
use crate::unavailable::UnavailableBackend;

/// Which backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendKind {
    /// Local Ollama server.
    #[default]
    Ollama,
    /// OpenAI or a compatible hosted API.
    OpenAi,
    /// No backend; generation is rejected.
    None,
}

impl BackendKind {
    /// Display name of the backend.
    #[must_use]
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Ollama => "Ollama",
            Self::OpenAi => "OpenAI",
            Self::None => "LLM backend",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Ollama => "ollama",
            Self::OpenAi => "openai",
            Self::None => "none",
        })
    }
}

impl FromStr for BackendKind {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ollama" | "local" => Ok(Self::Ollama),
            "openai" | "open-ai" | "openai-compatible" => Ok(Self::OpenAi),
            "none" | "off" | "disabled" => Ok(Self::None),
            other => Err(ModelError::configuration(format!(
                "unknown backend '{other}' (expected ollama, openai or none)"
            ))),
        }
    }
}

/// Backend configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BackendConfig {
    /// Backend kind.
    pub kind: BackendKind,
    /// Model name. Defaults per backend.
    pub model: Option<String>,
    /// API key for hosted backends.
    pub api_key: Option<String>,
    /// Base URL override.
    pub base_url: Option<String>,
    /// Default sampling temperature.
    pub temperature: Option<f64>,
    /// Request timeout.
    pub timeout: Option<Duration>,
}

impl BackendConfig {
    /// Create a config for the given backend.
    #[must_use]
    pub fn new(kind: BackendKind) -> Self {
        Self {
            kind,
            ..Default::default()
        }
    }

    /// Set the model.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set the API key.
    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Set the base URL.
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the temperature.
    #[must_use]
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Build the configured backend, filling gaps from the process environment
/// (`OLLAMA_HOST`, `OPENAI_API_KEY`, `OPENAI_BASE_URL`).
///
/// A hosted backend without an API key builds an [`UnavailableBackend`].
pub fn build_backend(config: &BackendConfig) -> BoxedBackend {
    build_backend_with_env(config, |key| std::env::var(key).ok())
}

/// Like [`build_backend`], reading environment values through `env`.
pub fn build_backend_with_env<F>(config: &BackendConfig, env: F) -> BoxedBackend
where
    F: Fn(&str) -> Option<String>,
{
    let lookup = |explicit: &Option<String>, key: &str| {
        explicit
            .clone()
            .or_else(|| env(key))
            .filter(|v| !v.trim().is_empty())
    };

    let backend: BoxedBackend = match config.kind {
        BackendKind::Ollama => build_ollama(config, lookup(&config.base_url, "OLLAMA_HOST")),
        BackendKind::OpenAi => build_openai(
            config,
            lookup(&config.api_key, "OPENAI_API_KEY"),
            lookup(&config.base_url, "OPENAI_BASE_URL"),
        ),
        BackendKind::None => Box::new(
            UnavailableBackend::new(BackendKind::None.display_name())
                .with_reason("no backend configured"),
        ),
    };

    debug!(
        backend = backend.name(),
        model = backend.model(),
        configured = backend.is_configured(),
        "Built backend"
    );
    backend
}

#[cfg(feature = "ollama")]
fn build_ollama(config: &BackendConfig, base_url: Option<String>) -> BoxedBackend {
    use crate::ollama::OllamaBackend;

    let model = config
        .model
        .clone()
        .unwrap_or_else(|| OllamaBackend::DEFAULT_MODEL.to_string());
    let mut backend = OllamaBackend::new(model);
    if let Some(url) = base_url {
        backend = backend.with_base_url(url);
    }
    if let Some(t) = config.temperature {
        backend = backend.with_temperature(t);
    }
    if let Some(timeout) = config.timeout {
        backend = backend.with_timeout(timeout);
    }
    Box::new(backend)
}

#[cfg(not(feature = "ollama"))]
fn build_ollama(config: &BackendConfig, _base_url: Option<String>) -> BoxedBackend {
    Box::new(
        UnavailableBackend::new("Ollama")
            .with_model(config.model.clone().unwrap_or_default())
            .with_reason("built without the `ollama` feature"),
    )
}

#[cfg(feature = "openai")]
fn build_openai(
    config: &BackendConfig,
    api_key: Option<String>,
    base_url: Option<String>,
) -> BoxedBackend {
    use crate::openai::OpenAiBackend;

    let model = config
        .model
        .clone()
        .unwrap_or_else(|| OpenAiBackend::DEFAULT_MODEL.to_string());
    let Some(api_key) = api_key else {
        return Box::new(
            UnavailableBackend::new("OpenAI")
                .with_model(model)
                .with_reason("OPENAI_API_KEY is not set"),
        );
    };

    let mut backend = OpenAiBackend::new(model, api_key);
    if let Some(url) = base_url {
        backend = backend.with_base_url(url);
    }
    if let Some(t) = config.temperature {
        backend = backend.with_temperature(t);
    }
    if let Some(timeout) = config.timeout {
        backend = backend.with_timeout(timeout);
    }
    Box::new(backend)
}

#[cfg(not(feature = "openai"))]
fn build_openai(
    config: &BackendConfig,
    _api_key: Option<String>,
    _base_url: Option<String>,
) -> BoxedBackend {
    Box::new(
        UnavailableBackend::new("OpenAI")
            .with_model(config.model.clone().unwrap_or_default())
            .with_reason("built without the `openai` feature"),
    )
}
