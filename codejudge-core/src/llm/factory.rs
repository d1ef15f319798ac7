//! Factory for creating LLM providers from configuration

use crate::config::{BackendConfig, LLMProvider as LLMProviderType};
use crate::error::{JudgeError, Result};
use crate::llm::LLMProvider;
use std::sync::Arc;

#[cfg(feature = "llm-ollama")]
use crate::llm::providers::ollama::OllamaProvider;

#[cfg(feature = "llm-openai")]
use crate::llm::providers::openai::OpenAIProvider;

#[cfg(feature = "llm-anthropic")]
use crate::llm::providers::anthropic::AnthropicProvider;

/// Factory for creating LLM providers
pub struct LLMProviderFactory;

impl LLMProviderFactory {
    /// Create an LLM provider for one scoring backend entry
    ///
    /// An empty `model` falls back to the provider's env var and then its default.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider cannot be created (e.g., missing API key
    /// or the provider's feature is disabled)
    pub fn create(config: &BackendConfig) -> Result<Arc<dyn LLMProvider>> {
        let model = (!config.model.is_empty()).then(|| config.model.clone());

        match config.provider {
            #[cfg(feature = "llm-openai")]
            LLMProviderType::OpenAI => {
                let provider = match (&config.api_key, &config.base_url) {
                    (None, None) => OpenAIProvider::from_env(model)?,
                    (api_key, base_url) => {
                        let api_key = match api_key {
                            Some(key) => key.clone(),
                            None => std::env::var("OPENAI_API_KEY").map_err(|_| {
                                JudgeError::Configuration(
                                    "OPENAI_API_KEY environment variable not set".to_string(),
                                )
                            })?,
                        };
                        let model = model
                            .or_else(|| std::env::var("OPENAI_MODEL").ok())
                            .unwrap_or_else(|| "gpt-4o-mini".to_string());
                        match base_url {
                            Some(base_url) => {
                                OpenAIProvider::with_base_url(api_key, model, base_url.clone())
                            }
                            None => OpenAIProvider::new(api_key, model),
                        }
                    }
                };

                Ok(Arc::new(provider))
            }

            #[cfg(not(feature = "llm-openai"))]
            LLMProviderType::OpenAI => Err(JudgeError::Configuration(
                "OpenAI provider requires 'llm-openai' feature".to_string(),
            )),

            #[cfg(feature = "llm-ollama")]
            LLMProviderType::Ollama => {
                let provider = match &config.base_url {
                    Some(url) => OllamaProvider::new(
                        model.unwrap_or_else(|| "qwen3:14b".to_string()),
                        Some(url.clone()),
                    ),
                    None => OllamaProvider::from_env(model),
                };

                Ok(Arc::new(provider))
            }

            #[cfg(not(feature = "llm-ollama"))]
            LLMProviderType::Ollama => Err(JudgeError::Configuration(
                "Ollama provider requires 'llm-ollama' feature".to_string(),
            )),

            #[cfg(feature = "llm-anthropic")]
            LLMProviderType::Anthropic => {
                let provider = match &config.api_key {
                    Some(api_key) => {
                        let model = model
                            .or_else(|| std::env::var("ANTHROPIC_MODEL").ok())
                            .unwrap_or_else(|| "claude-3-5-sonnet-20241022".to_string());
                        match &config.base_url {
                            Some(base_url) => AnthropicProvider::with_base_url(
                                api_key.clone(),
                                model,
                                base_url.clone(),
                            ),
                            None => AnthropicProvider::new(api_key.clone(), model),
                        }
                    }
                    None => AnthropicProvider::from_env(model)?,
                };

                Ok(Arc::new(provider))
            }

            #[cfg(not(feature = "llm-anthropic"))]
            LLMProviderType::Anthropic => Err(JudgeError::Configuration(
                "Anthropic provider requires 'llm-anthropic' feature".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend(provider: LLMProviderType, api_key: Option<&str>) -> BackendConfig {
        BackendConfig {
            name: "judge".to_string(),
            provider,
            model: "some-model".to_string(),
            structured: None,
            api_key: api_key.map(str::to_string),
            base_url: Some("http://127.0.0.1:9".to_string()),
        }
    }

    #[cfg(feature = "llm-openai")]
    #[test]
    fn test_create_openai_with_key() {
        let config = backend(LLMProviderType::OpenAI, Some("k"));
        let provider = LLMProviderFactory::create(&config).unwrap();
        let info = provider.model_info();
        assert_eq!(info.provider, "openai");
        assert_eq!(info.model_name, "some-model");
    }

    #[cfg(feature = "llm-ollama")]
    #[test]
    fn test_create_ollama() {
        let provider = LLMProviderFactory::create(&backend(LLMProviderType::Ollama, None)).unwrap();
        assert_eq!(provider.model_info().provider, "ollama");
    }

    #[cfg(not(feature = "llm-anthropic"))]
    #[test]
    fn test_disabled_feature_is_configuration_error() {
        let result = LLMProviderFactory::create(&backend(LLMProviderType::Anthropic, Some("k")));
        assert!(matches!(result, Err(JudgeError::Configuration(_))));
    }
}
