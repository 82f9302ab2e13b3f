//! Ollama chat provider.
//!
//! Talks to a local Ollama runtime through its chat endpoint.
//! Ollama API: https://github.com/ollama/ollama/blob/main/docs/api.md

use crate::client::{LlmClient, LlmRequest, LlmResponse, LlmUsage, ReplyContent};
use filings_core::{AppError, AppResult};
use serde::Serialize;
use std::time::Duration;

/// Ollama API request format.
#[derive(Debug, Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: Vec<OllamaMessage<'a>>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<OllamaOptions>,
}

#[derive(Debug, Serialize)]
struct OllamaMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

/// Ollama LLM client.
pub struct OllamaClient {
    /// Base URL for Ollama API
    base_url: String,

    /// HTTP client
    client: reqwest::Client,
}

impl OllamaClient {
    /// Create a new Ollama client with default settings.
    ///
    /// Default URL: http://localhost:11434
    pub fn new() -> Self {
        Self::with_base_url("http://localhost:11434")
    }

    /// Create a new Ollama client with a custom base URL.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Bound every request made by this client.
    pub fn with_timeout(mut self, timeout: Duration) -> AppResult<Self> {
        self.client = super::http_client(timeout)?;
        Ok(self)
    }

    /// Convert LlmRequest to Ollama format.
    fn to_ollama_request<'a>(&self, request: &'a LlmRequest) -> OllamaChatRequest<'a> {
        let options = if request.temperature.is_some() || request.max_tokens.is_some() {
            Some(OllamaOptions {
                temperature: request.temperature,
                num_predict: request.max_tokens,
            })
        } else {
            None
        };

        OllamaChatRequest {
            model: &request.model,
            messages: request
                .messages
                .iter()
                .map(|m| OllamaMessage {
                    role: m.role.as_str(),
                    content: &m.content,
                })
                .collect(),
            stream: false,
            options,
        }
    }

    /// Convert an Ollama response body to LlmResponse.
    ///
    /// A body without `message.content` is kept whole as raw content.
    fn convert_response(&self, body: serde_json::Value, requested_model: &str) -> LlmResponse {
        let model = body["model"]
            .as_str()
            .unwrap_or(requested_model)
            .to_string();

        let usage = LlmUsage::new(
            body["prompt_eval_count"].as_u64().unwrap_or(0) as u32,
            body["eval_count"].as_u64().unwrap_or(0) as u32,
        );

        let text = body["message"]["content"].as_str().map(str::to_string);
        let content = match text {
            Some(text) => ReplyContent::Text(text),
            None => ReplyContent::Raw(body),
        };

        LlmResponse {
            content,
            model,
            usage,
        }
    }
}

impl Default for OllamaClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl LlmClient for OllamaClient {
    fn provider_name(&self) -> &str {
        "ollama"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        tracing::info!(model = %request.model, "Sending chat request to Ollama");

        let ollama_request = self.to_ollama_request(request);
        let url = format!("{}/api/chat", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&ollama_request)
            .send()
            .await
            .map_err(|e| AppError::Llm(format!("Failed to send request to Ollama: {}", e)))?;

        if !response.status().is_success() {
            return Err(super::http_error("Ollama", response).await);
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| AppError::Llm(format!("Failed to parse Ollama response: {}", e)))?;

        tracing::debug!("Ollama response: {}", body);

        Ok(self.convert_response(body, &request.model))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ChatMessage;
    use serde_json::json;

    #[test]
    fn test_ollama_client_creation() {
        let client = OllamaClient::with_base_url("http://localhost:11434/");
        assert_eq!(client.provider_name(), "ollama");
        assert_eq!(client.base_url, "http://localhost:11434");
    }

    #[test]
    fn test_ollama_request_conversion() {
        let client = OllamaClient::new();
        let request = LlmRequest::new(
            vec![ChatMessage::system("sys"), ChatMessage::user("Hello")],
            "llama3.2",
        )
        .with_temperature(0.2)
        .with_max_tokens(100);

        let body = serde_json::to_value(client.to_ollama_request(&request)).unwrap();
        assert_eq!(body["model"], "llama3.2");
        assert_eq!(body["stream"], false);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "Hello");
        assert_eq!(body["options"]["num_predict"], 100);
    }

    #[test]
    fn test_convert_chat_response() {
        let client = OllamaClient::new();
        let response = client.convert_response(
            json!({
                "model": "llama3.2",
                "message": {"role": "assistant", "content": " Net income rose. "},
                "done": true,
                "prompt_eval_count": 12,
                "eval_count": 4
            }),
            "llama3.2",
        );

        assert_eq!(response.extract_text(), "Net income rose.");
        assert_eq!(response.usage.total_tokens, 16);
    }

    #[test]
    fn test_convert_unexpected_shape_keeps_raw_body() {
        let client = OllamaClient::new();
        let response = client.convert_response(json!({"done": true}), "llama3.2");

        assert!(matches!(response.content, ReplyContent::Raw(_)));
        assert_eq!(response.model, "llama3.2");
        assert!(response.extract_text().contains("done"));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_llm_error() {
        let client = OllamaClient::with_base_url("http://127.0.0.1:9")
            .with_timeout(std::time::Duration::from_secs(2))
            .unwrap();
        let request = LlmRequest::new(vec![ChatMessage::user("Hello")], "llama3.2");

        let err = client.complete(&request).await.unwrap_err();
        assert!(matches!(err, AppError::Llm(_)));
        assert!(err.to_string().contains("Failed to send request to Ollama"));
    }
}
