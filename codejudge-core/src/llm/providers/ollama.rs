//! Ollama LLM provider implementation

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{JudgeError, Result};
use crate::llm::{LLMProvider, LLMRequest, LLMResponse, ModelInfo, TokenUsage, http_error};

const DEFAULT_BASE_URL: &str = "http://localhost:11434";
const DEFAULT_MODEL: &str = "qwen3:14b";

/// Ollama LLM provider (local, runs on your machine).
pub struct OllamaProvider {
    client: reqwest::Client,
    model: String,
    base_url: String,
}

impl OllamaProvider {
    /// Create a new Ollama provider.
    ///
    /// # Arguments
    ///
    /// * `model` - Model name (e.g., "qwen3:14b")
    /// * `base_url` - Base URL for Ollama API (defaults to "http://localhost:11434")
    pub fn new(model: impl Into<String>, base_url: Option<impl Into<String>>) -> Self {
        Self {
            client: reqwest::Client::new(),
            model: model.into(),
            base_url: base_url
                .map(|u| u.into().trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        }
    }

    /// Create from environment variables.
    ///
    /// Reads from:
    /// - `OLLAMA_MODEL` - Model name (optional, defaults to "qwen3:14b")
    /// - `OLLAMA_BASE_URL` - Base URL (optional, defaults to "http://localhost:11434")
    pub fn from_env(model: Option<impl Into<String>>) -> Self {
        let model = model
            .map(|m| m.into())
            .or_else(|| std::env::var("OLLAMA_MODEL").ok())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        Self::new(model, std::env::var("OLLAMA_BASE_URL").ok())
    }

    /// Get the model name.
    pub fn model(&self) -> &str {
        &self.model
    }

    fn build_request(&self, request: &LLMRequest, format: Option<Value>) -> OllamaRequest {
        OllamaRequest {
            model: self.model.clone(),
            messages: request
                .messages
                .iter()
                .map(|m| OllamaMessage {
                    role: m.role.as_str(),
                    content: m.content.clone(),
                })
                .collect(),
            stream: false,
            format,
            options: OllamaOptions {
                temperature: request.temperature,
                num_predict: request.max_tokens,
                stop: request.stop(),
            },
        }
    }

    async fn send(&self, body: &OllamaRequest) -> Result<LLMResponse> {
        let url = format!("{}/api/chat", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                JudgeError::Provider(format!(
                    "Failed to send request to Ollama: {}. Make sure Ollama is running.",
                    e
                ))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(http_error("Ollama", status, text));
        }

        let ollama_response: OllamaResponse = response.json().await.map_err(|e| {
            JudgeError::Provider(format!("Failed to parse Ollama response: {}", e))
        })?;

        let OllamaMessageResponse { content, thinking } = ollama_response.message;
        // Reasoning models may leave content empty and answer in `thinking`
        let content = match content.trim() {
            "" => thinking.unwrap_or_default().trim().to_string(),
            trimmed => trimmed.to_string(),
        };

        let usage = match (ollama_response.prompt_eval_count, ollama_response.eval_count) {
            (Some(prompt_tokens), Some(completion_tokens)) => Some(TokenUsage {
                prompt_tokens,
                completion_tokens,
                total_tokens: prompt_tokens + completion_tokens,
            }),
            _ => None,
        };

        Ok(LLMResponse { content, usage })
    }
}

#[derive(Serialize)]
struct OllamaRequest {
    model: String,
    messages: Vec<OllamaMessage>,
    stream: bool,
    /// `"json"` or a JSON schema
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<Value>,
    options: OllamaOptions,
}

#[derive(Serialize)]
struct OllamaMessage {
    role: &'static str,
    content: String,
}

#[derive(Serialize)]
struct OllamaOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop: Option<Vec<String>>,
}

#[derive(Deserialize)]
struct OllamaResponse {
    message: OllamaMessageResponse,
    #[serde(default)]
    prompt_eval_count: Option<usize>,
    #[serde(default)]
    eval_count: Option<usize>,
}

#[derive(Deserialize)]
struct OllamaMessageResponse {
    content: String,
    #[serde(default)]
    thinking: Option<String>,
}

#[async_trait]
impl LLMProvider for OllamaProvider {
    async fn generate_request(&self, request: &LLMRequest) -> Result<LLMResponse> {
        self.send(&self.build_request(request, None)).await
    }

    async fn generate_structured(
        &self,
        request: &LLMRequest,
        schema: Option<Value>,
    ) -> Result<Value> {
        let format = schema.unwrap_or_else(|| Value::String("json".to_string()));
        let response = self.send(&self.build_request(request, Some(format))).await?;
        serde_json::from_str(&response.content).map_err(|e| {
            JudgeError::Parse(format!("Ollama returned non-JSON structured output: {}", e))
        })
    }

    fn model_info(&self) -> ModelInfo {
        ModelInfo {
            provider: "ollama".to_string(),
            model_name: self.model.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ollama_provider_creation() {
        let provider = OllamaProvider::new("qwen3:14b", None::<String>);
        assert_eq!(provider.model(), "qwen3:14b");
        assert_eq!(provider.base_url, "http://localhost:11434");
    }

    #[test]
    fn test_structured_request_carries_schema() {
        let provider = OllamaProvider::new("llama3.1", Some("http://gpu-box:11434/"));
        let schema = json!({"type": "object", "required": ["winner"]});
        let request = LLMRequest::from_prompt("judge").max_tokens(64);
        let body = provider.build_request(&request, Some(schema.clone()));
        let value = serde_json::to_value(&body).unwrap();

        assert_eq!(value["format"], schema);
        assert_eq!(value["stream"], false);
        assert_eq!(value["options"]["num_predict"], 64);
        assert!(value["options"].get("stop").is_none());
        assert_eq!(provider.base_url, "http://gpu-box:11434");
    }

    #[test]
    fn test_text_request_has_no_format() {
        let provider = OllamaProvider::new("llama3.1", None::<String>);
        let body = provider.build_request(&LLMRequest::from_prompt("x"), None);
        let value = serde_json::to_value(body).unwrap();
        assert!(value.get("format").is_none());
    }
}
