//! Structured object generation.
//!
//! [`Generator::generate_object`] drives a [`Backend`] through the recovery
//! pipeline:
//!
//! ```text
//! generate -> extract -> repair -> parse -> coerce -> validate -> T
//!     ^                                                   |
//!     +------------- backoff, while attempts remain ------+
//! ```
//!
//! Two strategies share that contract. [`GenerationStrategy::Retrying`] runs
//! the full pipeline with bounded retries. [`GenerationStrategy::SingleShot`]
//! makes one call and parses the extracted candidate as-is, rejecting on the
//! first failure. Each backend declares which one it defaults to.

use devlens_models::{Backend, BoxedBackend, GenerateOptions, StrategyHint};
use devlens_output::{
    coerce, extract_candidate, repair, validate, NoOpValidator, OutputValidator, SchemaDescriptor,
};
use devlens_retries::{with_retry_state, CancellationToken, RetryConfig};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::attempt::{AttemptFailure, GenerationAttempt};
use crate::error::{GenerationError, GenerationFailure, GenerationResult};
use crate::prompt::frame_prompt;

/// A request for one structured object.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    /// Caller's prompt.
    pub prompt: String,
    /// Shape of the expected object.
    pub schema: SchemaDescriptor,
    /// Sampling temperature; the backend's default when unset.
    pub temperature: Option<f64>,
    /// System prompt.
    pub system: Option<String>,
    /// Append the schema and output instructions to the prompt.
    pub frame_prompt: bool,
}

impl GenerationRequest {
    /// Create a request.
    pub fn new(prompt: impl Into<String>, schema: SchemaDescriptor) -> Self {
        Self {
            prompt: prompt.into(),
            schema,
            temperature: None,
            system: None,
            frame_prompt: true,
        }
    }

    /// Set the temperature.
    #[must_use]
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set the system prompt.
    #[must_use]
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Send the prompt exactly as given.
    #[must_use]
    pub fn without_framing(mut self) -> Self {
        self.frame_prompt = false;
        self
    }

    /// The prompt sent to the backend.
    #[must_use]
    pub fn rendered_prompt(&self) -> String {
        if self.frame_prompt {
            frame_prompt(&self.prompt, &self.schema)
        } else {
            self.prompt.clone()
        }
    }

    fn options(&self) -> GenerateOptions {
        GenerateOptions {
            temperature: self.temperature,
            system: self.system.clone(),
            ..Default::default()
        }
    }
}

/// How model output is turned into a value.
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationStrategy {
    /// Full pipeline with bounded retries and backoff.
    Retrying(RetryConfig),
    /// One call, no repair, first failure is final.
    SingleShot,
}

impl GenerationStrategy {
    /// Whether candidates are repaired before parsing.
    #[must_use]
    pub fn repairs(&self) -> bool {
        matches!(self, Self::Retrying(_))
    }

    fn retry_config(&self) -> RetryConfig {
        match self {
            Self::Retrying(config) => config.clone(),
            Self::SingleShot => RetryConfig::no_retry(),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Retrying(_) => "retrying",
            Self::SingleShot => "single_shot",
        }
    }
}

/// Generates typed objects from a backend.
///
/// Holds the backend and per-generator settings; every call owns its own
/// attempt history.
#[derive(Debug)]
pub struct Generator {
    backend: BoxedBackend,
    retry: RetryConfig,
    strategy: Option<GenerationStrategy>,
    cancel: CancellationToken,
    timeout: Option<Duration>,
}

impl Generator {
    /// Create a generator for a backend.
    pub fn new(backend: impl Backend + 'static) -> Self {
        Self::from_boxed(Box::new(backend))
    }

    /// Create a generator for a boxed backend.
    #[must_use]
    pub fn from_boxed(backend: BoxedBackend) -> Self {
        Self {
            backend,
            retry: RetryConfig::default(),
            strategy: None,
            cancel: CancellationToken::new(),
            timeout: None,
        }
    }

    /// Retry settings used when the strategy comes from the backend default.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Override the backend's default strategy.
    #[must_use]
    pub fn with_strategy(mut self, strategy: GenerationStrategy) -> Self {
        self.strategy = Some(strategy);
        self
    }

    /// Stop generation when `token` is cancelled.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Limit the total time of one `generate_object` call.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// The backend.
    #[must_use]
    pub fn backend(&self) -> &dyn Backend {
        self.backend.as_ref()
    }

    /// Mutable access to the backend, e.g. to switch models.
    pub fn backend_mut(&mut self) -> &mut dyn Backend {
        self.backend.as_mut()
    }

    /// The strategy calls will use.
    #[must_use]
    pub fn strategy(&self) -> GenerationStrategy {
        match self.strategy {
            Some(ref strategy) => strategy.clone(),
            None => match self.backend.default_strategy() {
                StrategyHint::Retrying => GenerationStrategy::Retrying(self.retry.clone()),
                StrategyHint::SingleShot => GenerationStrategy::SingleShot,
            },
        }
    }

    /// Generate an object of type `T`.
    pub async fn generate_object<T: DeserializeOwned>(
        &self,
        request: &GenerationRequest,
    ) -> GenerationResult<T> {
        self.generate_object_validated(request, &NoOpValidator).await
    }

    /// Generate an object of type `T`, then run `validator` on it. A rejection
    /// counts as a validation failure for the attempt.
    pub async fn generate_object_validated<T, V>(
        &self,
        request: &GenerationRequest,
        validator: &V,
    ) -> GenerationResult<T>
    where
        T: DeserializeOwned,
        V: OutputValidator<T> + ?Sized,
    {
        let backend = self.backend.name();
        if !self.backend.is_configured() {
            warn!(backend, "Backend not configured, rejecting generation");
            return Err(GenerationError::unavailable(backend));
        }

        let strategy = self.strategy();
        let config = strategy.retry_config();
        let prompt = request.rendered_prompt();
        let options = request.options();
        let token = self.cancel.child_token();

        debug!(
            backend,
            model = self.backend.model(),
            strategy = strategy.name(),
            max_attempts = config.attempt_limit(),
            "Generating structured object"
        );

        let run = with_retry_state(&config, &token, |attempt| {
            self.attempt::<T, V>(
                &prompt,
                &options,
                &request.schema,
                &strategy,
                validator,
                attempt,
            )
        });

        let (result, state) = match self.timeout {
            Some(limit) => {
                tokio::pin!(run);
                tokio::select! {
                    out = &mut run => out,
                    _ = tokio::time::sleep(limit) => {
                        warn!(backend, timeout_ms = limit.as_millis() as u64, "Generation timed out");
                        token.cancel();
                        run.await
                    }
                }
            }
            None => run.await,
        };

        match result {
            Ok(value) => {
                info!(backend, attempts = state.attempt, "Generated structured object");
                Ok(value)
            }
            Err(last) => {
                let mut attempts: Vec<GenerationAttempt> = state
                    .history
                    .into_iter()
                    .filter_map(|info| info.error)
                    .map(|failure| failure.record)
                    .collect();
                attempts.push(last.record);

                warn!(
                    backend,
                    attempts = attempts.len(),
                    category = %last.failure.category(),
                    error = %last.failure.chain(),
                    "Structured generation failed"
                );
                Err(GenerationError::Failed {
                    backend: backend.to_string(),
                    attempts,
                    source: last.failure,
                })
            }
        }
    }

    async fn attempt<T, V>(
        &self,
        prompt: &str,
        options: &GenerateOptions,
        schema: &SchemaDescriptor,
        strategy: &GenerationStrategy,
        validator: &V,
        attempt_number: u32,
    ) -> Result<T, AttemptFailure>
    where
        T: DeserializeOwned,
        V: OutputValidator<T> + ?Sized,
    {
        let mut record = GenerationAttempt::new(attempt_number);

        let raw = match self.backend.generate(prompt, options).await {
            Ok(raw) => raw,
            Err(e) => return Err(fail(record, e.into())),
        };
        record.raw_output = Some(raw.clone());

        let candidate = match extract_candidate(&raw) {
            Ok(candidate) => candidate,
            Err(e) => return Err(fail(record, e.into())),
        };
        let candidate = if strategy.repairs() {
            repair(candidate)
        } else {
            candidate
        };
        record.candidate = Some(candidate.text().to_string());
        record.record_repairs(candidate.repairs());

        let parsed = match candidate.parse() {
            Ok(value) => value,
            Err(e) => return Err(fail(record, e.into())),
        };

        let value = coerce(parsed, schema);
        record.coerced_value = Some(value.clone());

        let typed = validate::<T>(value, schema)
            .and_then(|typed| validator.validate(typed))
            .map_err(GenerationFailure::from);

        match typed {
            Ok(typed) => {
                debug!(attempt = attempt_number, repairs = ?record.repairs, "Attempt succeeded");
                Ok(typed)
            }
            Err(failure) => Err(fail(record, failure)),
        }
    }
}

fn fail(record: GenerationAttempt, failure: GenerationFailure) -> AttemptFailure {
    let failure = AttemptFailure::new(record, failure);
    warn!(
        attempt = failure.record.attempt_number,
        category = %failure.category(),
        error = %failure.failure.chain(),
        "Generation attempt failed"
    );
    failure
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureCategory;
    use devlens_models::{MockBackend, ModelError};
    use devlens_output::{FieldKind, OutputValidationError, SyncValidator, ValidationIssue};
    use pretty_assertions::assert_eq;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Verdict {
        approved: bool,
        score: u32,
    }

    fn request() -> GenerationRequest {
        GenerationRequest::new(
            "Is this change safe?",
            SchemaDescriptor::new()
                .field("approved", FieldKind::Boolean)
                .field("score", FieldKind::Number),
        )
    }

    fn generator(backend: &MockBackend) -> Generator {
        Generator::new(backend.clone()).with_retry(RetryConfig::immediate())
    }

    #[tokio::test]
    async fn test_recovers_from_prose_and_fences() {
        let backend = MockBackend::new().with_text(
            "Sure! Here is my verdict:\n```json\n{\"approved\": \"yes\", \"score\": \"85%\",}\n```\nLet me know.",
        );
        let verdict: Verdict = generator(&backend).generate_object(&request()).await.unwrap();
        assert_eq!(
            verdict,
            Verdict {
                approved: true,
                score: 85
            }
        );
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test]
    async fn test_missing_brace_is_repaired() {
        let backend = MockBackend::new().with_text("{\"approved\": false, \"score\": 40");
        let verdict: Verdict = generator(&backend).generate_object(&request()).await.unwrap();
        assert_eq!(verdict.score, 40);
    }

    #[tokio::test]
    async fn test_plain_text_fails_after_max_attempts() {
        let backend = MockBackend::new().with_fallback_text("I think the change looks fine.");
        let err = generator(&backend)
            .generate_object::<Verdict>(&request())
            .await
            .unwrap_err();

        assert_eq!(backend.calls(), 3);
        assert_eq!(err.to_string(), "Failed to generate structured object with Mock");
        assert_eq!(err.category(), Some(FailureCategory::Extraction));
        let numbers: Vec<u32> = err.attempts().iter().map(|a| a.attempt_number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        assert!(err.attempts().iter().all(|a| a.candidate.is_none()));
    }

    #[tokio::test]
    async fn test_network_error_on_every_attempt() {
        let backend = MockBackend::new()
            .with_fallback_error(|| ModelError::Connection("connection refused".into()));
        let err = generator(&backend)
            .with_retry(RetryConfig::immediate().max_attempts(4))
            .generate_object::<Verdict>(&request())
            .await
            .unwrap_err();

        assert_eq!(backend.calls(), 4);
        assert_eq!(err.attempts().len(), 4);
        assert!(matches!(
            err.failure(),
            Some(GenerationFailure::Network(ModelError::Connection(_)))
        ));
        assert!(err.failure().unwrap().chain().contains("connection refused"));
        assert!(err.attempts()[0]
            .error
            .as_deref()
            .is_some_and(|e| e.ends_with("Connection error: connection refused")));
    }

    #[tokio::test]
    async fn test_retry_then_success() {
        let backend = MockBackend::new()
            .with_text("no json here")
            .with_error(|| ModelError::network("reset"))
            .with_text("{\"approved\": true, \"score\": 90}");
        let verdict: Verdict = generator(&backend).generate_object(&request()).await.unwrap();
        assert_eq!(verdict.score, 90);
        assert_eq!(backend.calls(), 3);
    }

    #[tokio::test]
    async fn test_validation_failure_is_retried() {
        let backend = MockBackend::new()
            .with_text("{\"score\": 10}")
            .with_text("{\"approved\": true, \"score\": 10}");
        let verdict: Verdict = generator(&backend).generate_object(&request()).await.unwrap();
        assert!(verdict.approved);
        assert_eq!(backend.calls(), 2);
    }

    #[tokio::test]
    async fn test_single_shot_rejects_comment_laden_output() {
        let backend = MockBackend::new()
            .with_name("OpenAI")
            .with_strategy(StrategyHint::SingleShot)
            .with_fallback_text("{\n  // approved after review\n  \"approved\": true,\n  \"score\": 70\n}");
        let generator = generator(&backend);
        assert_eq!(generator.strategy(), GenerationStrategy::SingleShot);

        let err = generator
            .generate_object::<Verdict>(&request())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Failed to generate structured object with OpenAI");
        assert_eq!(err.category(), Some(FailureCategory::Repair));
        assert_eq!(backend.calls(), 1);
        assert!(err.attempts()[0].repairs.is_empty());
    }

    #[tokio::test]
    async fn test_retrying_override_repairs_comments() {
        let backend = MockBackend::new()
            .with_strategy(StrategyHint::SingleShot)
            .with_text("{\n  // approved after review\n  \"approved\": true,\n  \"score\": 70\n}");
        let verdict: Verdict = generator(&backend)
            .with_strategy(GenerationStrategy::Retrying(RetryConfig::immediate()))
            .generate_object(&request())
            .await
            .unwrap();
        assert_eq!(verdict.score, 70);
    }

    #[tokio::test]
    async fn test_unconfigured_backend_does_no_work() {
        let backend = MockBackend::new().with_name("OpenAI").unconfigured();
        let err = generator(&backend)
            .generate_object::<Verdict>(&request())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "OpenAI is not available");
        assert!(matches!(err, GenerationError::Unavailable { .. }));
        assert_eq!(backend.calls(), 0);
    }

    #[tokio::test]
    async fn test_backend_cancellation_is_terminal() {
        let backend = MockBackend::new()
            .with_error(|| ModelError::Cancelled)
            .with_fallback_text("{\"approved\": true, \"score\": 1}");
        let err = generator(&backend)
            .generate_object::<Verdict>(&request())
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_during_backoff() {
        let backend = MockBackend::new().with_fallback_text("still no json");
        let token = CancellationToken::new();
        let generator = Generator::new(backend.clone())
            .with_retry(RetryConfig::new())
            .with_cancellation(token.clone());

        let trigger = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(500)).await;
            trigger.cancel();
        });

        let err = generator
            .generate_object::<Verdict>(&request())
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(backend.calls(), 1);
        assert_eq!(err.attempts().len(), 2);
        assert_eq!(err.attempts()[0].category, Some("extraction"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_cancels_slow_backend() {
        let backend = MockBackend::new()
            .with_delay(Duration::from_secs(60))
            .with_fallback_text("{\"approved\": true, \"score\": 1}");
        let err = generator(&backend)
            .with_timeout(Duration::from_secs(1))
            .generate_object::<Verdict>(&request())
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test]
    async fn test_custom_validator_rejection_is_retried() {
        let backend = MockBackend::new()
            .with_text("{\"approved\": true, \"score\": 250}")
            .with_text("{\"approved\": true, \"score\": 95}");
        let validator = SyncValidator::new(|v: Verdict| {
            if v.score > 100 {
                Err(OutputValidationError::schema(vec![ValidationIssue::new(
                    "$.score",
                    "at most 100",
                    v.score.to_string(),
                )]))
            } else {
                Ok(v)
            }
        });
        let verdict: Verdict = generator(&backend)
            .generate_object_validated(&request(), &validator)
            .await
            .unwrap();
        assert_eq!(verdict.score, 95);
        assert_eq!(backend.calls(), 2);
    }

    #[tokio::test]
    async fn test_prompt_is_framed_with_schema() {
        let backend = MockBackend::new().with_text("{\"approved\": true, \"score\": 1}");
        let _: Verdict = generator(&backend).generate_object(&request()).await.unwrap();
        let prompt = &backend.prompts()[0];
        assert!(prompt.starts_with("Is this change safe?"));
        assert!(prompt.contains("\"approved\""));

        let raw = request().without_framing();
        assert_eq!(raw.rendered_prompt(), "Is this change safe?");
    }

    #[test]
    fn test_backend_mut_switches_model() {
        let mut generator = Generator::new(MockBackend::new());
        generator.backend_mut().set_model("other");
        assert_eq!(generator.backend().model(), "other");
        assert!(matches!(generator.strategy(), GenerationStrategy::Retrying(_)));
    }

    #[rstest::rstest]
    #[case(StrategyHint::Retrying, None, true)]
    #[case(StrategyHint::SingleShot, None, false)]
    #[case(StrategyHint::SingleShot, Some(GenerationStrategy::Retrying(RetryConfig::immediate())), true)]
    #[case(StrategyHint::Retrying, Some(GenerationStrategy::SingleShot), false)]
    fn test_strategy_resolution(
        #[case] hint: StrategyHint,
        #[case] explicit: Option<GenerationStrategy>,
        #[case] repairs: bool,
    ) {
        let mut generator = Generator::new(MockBackend::new().with_strategy(hint));
        if let Some(strategy) = explicit {
            generator = generator.with_strategy(strategy);
        }
        assert_eq!(generator.strategy().repairs(), repairs);
    }

    #[cfg(feature = "ollama")]
    #[tokio::test]
    async fn test_ollama_end_to_end_retries_server_error() {
        use devlens_models::OllamaBackend;
        use serde_json::json;
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(503).set_body_string("loading model"))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "model": "llama3.1",
                "response": "Verdict:\n```json\n{\"approved\": \"TRUE\", \"score\": \"88%\",}\n```",
                "done": true
            })))
            .expect(1)
            .mount(&server)
            .await;

        let backend = OllamaBackend::new("llama3.1").with_base_url(server.uri());
        let verdict: Verdict = Generator::new(backend)
            .with_retry(RetryConfig::immediate())
            .generate_object(&request())
            .await
            .unwrap();
        assert_eq!(verdict, Verdict { approved: true, score: 88 });
    }

    #[cfg(feature = "openai")]
    #[tokio::test]
    async fn test_openai_end_to_end_single_shot() {
        use devlens_models::OpenAiBackend;
        use serde_json::json;
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "chatcmpl-1",
                "object": "chat.completion",
                "created": 0,
                "model": "gpt-4o-mini",
                "choices": [{
                    "index": 0,
                    "message": {"role": "assistant", "content": "{\"approved\": true, \"score\": 70,}"},
                    "finish_reason": "stop"
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let backend = OpenAiBackend::new("gpt-4o-mini", "sk-test").with_base_url(server.uri());
        let err = Generator::new(backend)
            .generate_object::<Verdict>(&request())
            .await
            .unwrap_err();
        assert_eq!(err.category(), Some(FailureCategory::Repair));
        assert_eq!(err.attempts().len(), 1);
        assert!(err.to_string().ends_with("with OpenAI"));
    }
}
