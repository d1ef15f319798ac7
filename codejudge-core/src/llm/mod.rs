use async_trait::async_trait;
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::error::{JudgeError, Result};

/// Helper function to generate structured output and deserialize it.
///
/// This is a convenience wrapper around `generate_structured` that handles deserialization.
/// The value must match `T` exactly; nothing is defaulted.
pub async fn generate_structured_output<T: DeserializeOwned>(
    provider: &dyn LLMProvider,
    request: &LLMRequest,
    schema: Option<serde_json::Value>,
) -> Result<T> {
    let json = provider.generate_structured(request, schema).await?;
    if json.is_null() {
        return Err(JudgeError::Parse("structured output was null".to_string()));
    }
    serde_json::from_value(json).map_err(|e| {
        JudgeError::Parse(format!("Failed to deserialize structured output: {}", e))
    })
}

/// Message role in a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::System => "system",
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }
}

/// A message in a backend conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

/// Request to an LLM provider
#[derive(Debug, Clone)]
pub struct LLMRequest {
    /// Messages in the conversation
    pub messages: Vec<ChatMessage>,

    /// Temperature for generation (0.0-2.0)
    pub temperature: Option<f32>,

    /// Maximum tokens to generate
    pub max_tokens: Option<usize>,

    /// Stop sequences
    pub stop_sequences: Vec<String>,
}

impl LLMRequest {
    /// Create a simple request from a single prompt
    pub fn from_prompt(prompt: impl Into<String>) -> Self {
        Self {
            messages: vec![ChatMessage {
                role: MessageRole::User,
                content: prompt.into(),
            }],
            temperature: None,
            max_tokens: None,
            stop_sequences: Vec::new(),
        }
    }

    /// Create a request with system prompt
    pub fn with_system_prompt(
        system_prompt: impl Into<String>,
        user_prompt: impl Into<String>,
    ) -> Self {
        Self {
            messages: vec![
                ChatMessage {
                    role: MessageRole::System,
                    content: system_prompt.into(),
                },
                ChatMessage {
                    role: MessageRole::User,
                    content: user_prompt.into(),
                },
            ],
            temperature: None,
            max_tokens: None,
            stop_sequences: Vec::new(),
        }
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature.clamp(0.0, 2.0));
        self
    }

    pub fn max_tokens(mut self, tokens: usize) -> Self {
        self.max_tokens = Some(tokens);
        self
    }

    /// Stop sequences, or `None` when there are none (for providers that reject empty lists)
    pub(crate) fn stop(&self) -> Option<Vec<String>> {
        (!self.stop_sequences.is_empty()).then(|| self.stop_sequences.clone())
    }
}

/// Response from an LLM provider
#[derive(Debug, Clone)]
pub struct LLMResponse {
    /// Generated content
    pub content: String,

    /// Token usage information
    pub usage: Option<TokenUsage>,
}

/// Token usage information
#[derive(Debug, Clone)]
pub struct TokenUsage {
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
    pub total_tokens: usize,
}

/// Trait for LLM provider implementations.
///
/// Every scoring backend is one of these. Implementors must report rate or
/// quota exhaustion as [`JudgeError::RateLimited`] so the cascade can back off.
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Generate free text from a request.
    async fn generate_request(&self, request: &LLMRequest) -> Result<LLMResponse>;

    /// Generate structured output (JSON) as a JSON value.
    ///
    /// # Arguments
    ///
    /// * `request` - The LLM request
    /// * `schema` - Optional JSON schema the output must conform to
    ///
    /// The default implementation asks for free text and parses it as JSON.
    async fn generate_structured(
        &self,
        request: &LLMRequest,
        _schema: Option<serde_json::Value>,
    ) -> Result<serde_json::Value> {
        let response = self.generate_request(request).await?;
        serde_json::from_str(response.content.trim()).map_err(|e| {
            JudgeError::Parse(format!("Failed to parse structured output: {}", e))
        })
    }

    /// Get model information
    fn model_info(&self) -> ModelInfo {
        ModelInfo {
            provider: "unknown".to_string(),
            model_name: "unknown".to_string(),
        }
    }
}

/// Model information
#[derive(Debug, Clone)]
pub struct ModelInfo {
    pub provider: String,
    pub model_name: String,
}

/// Map a non-success HTTP reply to an error; 429 becomes [`JudgeError::RateLimited`].
#[cfg_attr(
    not(any(feature = "llm-openai", feature = "llm-ollama", feature = "llm-anthropic")),
    allow(dead_code)
)]
pub(crate) fn http_error(
    provider: &str,
    status: reqwest::StatusCode,
    detail: String,
) -> JudgeError {
    let message = format!("{} API error ({}): {}", provider, status, detail);
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        JudgeError::RateLimited(message)
    } else {
        JudgeError::Provider(message)
    }
}

pub mod factory;
pub mod providers;

pub use factory::LLMProviderFactory;
