use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::backoff::{BackoffPolicy, BatchMode, Sleeper, TokioSleeper, is_quota_exhausted};
use super::evaluation::CaseEvaluation;
use super::prompt::JudgingPrompt;
use crate::config::ScoringConfig;
use crate::error::{JudgeError, Result};
use crate::llm::{LLMProvider, LLMProviderFactory, LLMRequest, generate_structured_output};
use crate::parsing::{JsonObjectParser, OutputParser};

/// Identity and capability of one scoring backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendDescriptor {
    pub name: String,
    pub supports_structured_output: bool,
}

/// A backend descriptor paired with the provider that serves it
#[derive(Clone)]
pub struct ScoringBackend {
    pub descriptor: BackendDescriptor,
    pub provider: Arc<dyn LLMProvider>,
}

impl ScoringBackend {
    pub fn new(
        name: impl Into<String>,
        supports_structured_output: bool,
        provider: Arc<dyn LLMProvider>,
    ) -> Self {
        Self {
            descriptor: BackendDescriptor {
                name: name.into(),
                supports_structured_output,
            },
            provider,
        }
    }
}

impl std::fmt::Debug for ScoringBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScoringBackend")
            .field("descriptor", &self.descriptor)
            .field("model", &self.provider.model_info().model_name)
            .finish()
    }
}

/// Ordered fallback across scoring backends.
///
/// Structured-output backends are tried first, then text-only ones, each group
/// in configured order. Every backend gets at most one attempt per case, and
/// [`ScoringCascade::score`] always yields an evaluation.
pub struct ScoringCascade {
    backends: Vec<ScoringBackend>,
    policy: BackoffPolicy,
    sleeper: Arc<dyn Sleeper>,
    attempt_timeout: Option<Duration>,
    temperature: f32,
    max_tokens: usize,
    parser: JsonObjectParser,
}

impl ScoringCascade {
    pub fn new(backends: Vec<ScoringBackend>, policy: BackoffPolicy) -> Self {
        let (mut ordered, text_only): (Vec<_>, Vec<_>) = backends
            .into_iter()
            .partition(|b| b.descriptor.supports_structured_output);
        ordered.extend(text_only);

        Self {
            backends: ordered,
            policy,
            sleeper: Arc::new(TokioSleeper),
            attempt_timeout: None,
            temperature: 0.2,
            max_tokens: 1024,
            parser: JsonObjectParser::new(),
        }
    }

    /// Build every configured backend through the provider factory
    ///
    /// # Errors
    ///
    /// Returns an error if any backend's provider cannot be created.
    pub fn from_config(config: &ScoringConfig) -> Result<Self> {
        let backends = config
            .backends
            .iter()
            .map(|backend| {
                Ok(ScoringBackend::new(
                    backend.name.clone(),
                    backend.supports_structured_output(),
                    LLMProviderFactory::create(backend)?,
                ))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self::new(backends, BackoffPolicy::from_config(config))
            .with_attempt_timeout(config.attempt_timeout)
            .with_sampling(config.temperature, config.max_tokens))
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = Some(timeout);
        self
    }

    pub fn with_sampling(mut self, temperature: f32, max_tokens: usize) -> Self {
        self.temperature = temperature;
        self.max_tokens = max_tokens;
        self
    }

    /// Backends in attempt order
    pub fn backends(&self) -> impl Iterator<Item = &BackendDescriptor> {
        self.backends.iter().map(|b| &b.descriptor)
    }

    /// Score one translation, degrading to a zeroed evaluation when every backend fails
    pub async fn score(&self, prompt: &JudgingPrompt<'_>, mode: BatchMode) -> CaseEvaluation {
        let mut last_error: Option<String> = None;

        for (index, backend) in self.backends.iter().enumerate() {
            let name = backend.descriptor.name.as_str();
            let has_next = index + 1 < self.backends.len();
            debug!(
                backend = name,
                structured = backend.descriptor.supports_structured_output,
                "scoring attempt"
            );

            match self.attempt(backend, prompt).await {
                Ok(evaluation) => {
                    info!(backend = name, winner = %evaluation.winner, "scoring succeeded");
                    return evaluation;
                }
                Err(err) if is_quota_exhausted(&err) => {
                    warn!(backend = name, error = %err, "scoring backend out of quota");
                    if has_next {
                        let pause = self.policy.interval(mode);
                        debug!(backend = name, pause = ?pause, "backing off before next backend");
                        self.sleeper.sleep(pause).await;
                    }
                    last_error = Some(format!("{}: {}", name, err));
                }
                Err(err) => {
                    warn!(backend = name, error = %err, "scoring backend failed");
                    last_error = Some(format!("{}: {}", name, err));
                }
            }
        }

        let reason = last_error.unwrap_or_else(|| "no scoring backend configured".to_string());
        warn!(reason = %reason, "all scoring backends failed, using degraded evaluation");
        CaseEvaluation::degraded(&reason)
    }

    async fn attempt(
        &self,
        backend: &ScoringBackend,
        prompt: &JudgingPrompt<'_>,
    ) -> Result<CaseEvaluation> {
        let call = async {
            if backend.descriptor.supports_structured_output {
                let request = self.sampled(prompt.structured_request());
                generate_structured_output::<CaseEvaluation>(
                    backend.provider.as_ref(),
                    &request,
                    Some(CaseEvaluation::json_schema()),
                )
                .await
            } else {
                let request = self.sampled(prompt.text_request());
                let response = backend.provider.generate_request(&request).await?;
                let object = self.parser.parse(&response.content)?;
                Ok(CaseEvaluation::from_lenient(&object))
            }
        };

        match self.attempt_timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .map_err(|_| JudgeError::Timeout(limit))?,
            None => call.await,
        }
    }

    fn sampled(&self, request: LLMRequest) -> LLMRequest {
        request
            .temperature(self.temperature)
            .max_tokens(self.max_tokens)
    }
}
