//! Configuration types for codejudge

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

use crate::error::{JudgeError, Result};

/// Main configuration for the evaluation engine
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CodeJudgeConfig {
    /// How the participant is contacted
    pub participant: ParticipantConfig,

    /// Scoring cascade configuration
    pub scoring: ScoringConfig,
}

/// Participant transport configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParticipantConfig {
    /// Upper bound for one participant call, including draining its event stream
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,

    /// Use `message/stream` (SSE) instead of `message/send`
    pub streaming: bool,

    /// Path of the agent card relative to the participant endpoint
    pub card_path: String,
}

impl Default for ParticipantConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(300),
            streaming: true,
            card_path: "/.well-known/agent-card.json".to_string(),
        }
    }
}

/// Scoring cascade configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Backends in preference order
    pub backends: Vec<BackendConfig>,

    /// Pause after a quota failure when the request has a single case
    #[serde(with = "humantime_serde")]
    pub single_case_backoff: Duration,

    /// Pause after a quota failure when the request has several cases
    #[serde(with = "humantime_serde")]
    pub multi_case_backoff: Duration,

    /// Upper bound for one backend attempt
    #[serde(with = "humantime_serde")]
    pub attempt_timeout: Duration,

    /// Sampling temperature sent to backends
    pub temperature: f32,

    /// Maximum tokens requested from backends
    pub max_tokens: usize,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            backends: Vec::new(),
            single_case_backoff: Duration::from_secs(30),
            multi_case_backoff: Duration::from_secs(5),
            attempt_timeout: Duration::from_secs(120),
            temperature: 0.2,
            max_tokens: 1024,
        }
    }
}

/// One scoring backend entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Name used in logs and degraded reasoning
    pub name: String,

    /// Provider type
    pub provider: LLMProvider,

    /// Model name (empty means the provider default)
    #[serde(default)]
    pub model: String,

    /// Override for structured-output capability
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structured: Option<bool>,

    /// API key (if needed, prefer env vars)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Base URL (for OpenAI-compatible gateways or a remote Ollama)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

impl BackendConfig {
    /// Whether the cascade should request schema-conforming output from this backend
    pub fn supports_structured_output(&self) -> bool {
        self.structured
            .unwrap_or_else(|| self.provider.supports_structured_output())
    }
}

/// LLM provider type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LLMProvider {
    OpenAI,
    Ollama,
    Anthropic,
}

impl LLMProvider {
    /// Default structured-output capability of the provider's API
    pub fn supports_structured_output(&self) -> bool {
        match self {
            LLMProvider::OpenAI | LLMProvider::Ollama => true,
            LLMProvider::Anthropic => false,
        }
    }
}

impl CodeJudgeConfig {
    /// Load configuration from file and environment variables.
    ///
    /// Loads in this order:
    /// 1. Default configuration
    /// 2. Configuration file (codejudge.toml)
    /// 3. Environment variable overrides (`CODEJUDGE_SCORING__ATTEMPT_TIMEOUT=30s`)
    /// 4. File named by CODEJUDGE_CONFIG_PATH
    ///
    /// # Errors
    ///
    /// Returns an error if configuration file is invalid or fails validation.
    pub fn load() -> Result<Self> {
        use figment::{
            Figment,
            providers::{Env, Format, Serialized, Toml},
        };

        let mut figment = Figment::from(Serialized::defaults(CodeJudgeConfig::default()))
            .merge(Toml::file("codejudge.toml"))
            .merge(Env::prefixed("CODEJUDGE_").ignore(&["CONFIG_PATH"]).split("__"));

        if let Ok(path) = std::env::var("CODEJUDGE_CONFIG_PATH") {
            figment = figment.merge(Toml::file(path));
        }

        let config: CodeJudgeConfig = figment.extract().map_err(|e| {
            JudgeError::Configuration(format!("Failed to load configuration: {}", e))
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        use figment::{
            Figment,
            providers::{Format, Serialized, Toml},
        };

        let config: CodeJudgeConfig =
            Figment::from(Serialized::defaults(CodeJudgeConfig::default()))
                .merge(Toml::file(path))
                .extract()
                .map_err(|e| {
                    JudgeError::Configuration(format!(
                        "Failed to load configuration file: {}",
                        e
                    ))
                })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if no backend is configured, names collide, or a timeout is zero.
    pub fn validate(&self) -> Result<()> {
        if self.scoring.backends.is_empty() {
            return Err(JudgeError::Configuration(
                "at least one scoring backend must be configured".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for backend in &self.scoring.backends {
            if backend.name.trim().is_empty() {
                return Err(JudgeError::Configuration(
                    "scoring backend name must not be empty".to_string(),
                ));
            }
            if !seen.insert(backend.name.as_str()) {
                return Err(JudgeError::Configuration(format!(
                    "duplicate scoring backend name: {}",
                    backend.name
                )));
            }
        }

        if self.participant.timeout.is_zero() || self.scoring.attempt_timeout.is_zero() {
            return Err(JudgeError::Configuration(
                "timeouts must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn backend(name: &str, provider: LLMProvider) -> BackendConfig {
        BackendConfig {
            name: name.to_string(),
            provider,
            model: String::new(),
            structured: None,
            api_key: None,
            base_url: None,
        }
    }

    #[test]
    fn test_defaults() {
        let config = CodeJudgeConfig::default();
        assert_eq!(config.participant.timeout, Duration::from_secs(300));
        assert!(config.participant.streaming);
        assert_eq!(config.scoring.single_case_backoff, Duration::from_secs(30));
        assert_eq!(config.scoring.multi_case_backoff, Duration::from_secs(5));
    }

    #[test]
    fn test_validate_requires_backend() {
        let config = CodeJudgeConfig::default();
        assert!(matches!(
            config.validate(),
            Err(JudgeError::Configuration(_))
        ));
    }

    #[test]
    fn test_validate_rejects_duplicate_names() {
        let mut config = CodeJudgeConfig::default();
        config.scoring.backends = vec![
            backend("judge", LLMProvider::OpenAI),
            backend("judge", LLMProvider::Anthropic),
        ];
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn test_structured_capability_defaults() {
        assert!(backend("a", LLMProvider::OpenAI).supports_structured_output());
        assert!(backend("b", LLMProvider::Ollama).supports_structured_output());
        assert!(!backend("c", LLMProvider::Anthropic).supports_structured_output());

        let mut forced = backend("d", LLMProvider::OpenAI);
        forced.structured = Some(false);
        assert!(!forced.supports_structured_output());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[participant]
timeout = "45s"
streaming = false

[scoring]
multi_case_backoff = "2s"

[[scoring.backends]]
name = "primary"
provider = "openai"
model = "gpt-4o-mini"

[[scoring.backends]]
name = "fallback"
provider = "anthropic"
"#
        )
        .unwrap();

        let config = CodeJudgeConfig::from_file(file.path()).unwrap();
        assert_eq!(config.participant.timeout, Duration::from_secs(45));
        assert!(!config.participant.streaming);
        assert_eq!(config.participant.card_path, "/.well-known/agent-card.json");
        assert_eq!(config.scoring.multi_case_backoff, Duration::from_secs(2));
        assert_eq!(config.scoring.single_case_backoff, Duration::from_secs(30));
        assert_eq!(config.scoring.backends.len(), 2);
        assert_eq!(config.scoring.backends[0].model, "gpt-4o-mini");
        assert_eq!(config.scoring.backends[1].provider, LLMProvider::Anthropic);
    }

    #[test]
    fn test_from_file_invalid() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[participant]\ntimeout = \"soon\"").unwrap();
        assert!(CodeJudgeConfig::from_file(file.path()).is_err());
    }
}
