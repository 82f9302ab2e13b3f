//! Claude provider over the Anthropic Messages API.
//!
//! Key differences from Ollama:
//! - Auth via `x-api-key` header
//! - Required `anthropic-version` header
//! - System text is a top-level `system` field, not part of `messages`
//! - Replies are a list of typed content blocks

use crate::client::{ContentBlock, LlmClient, LlmRequest, LlmResponse, LlmUsage, ReplyContent};
use filings_core::{AppError, AppResult};
use serde_json::{json, Value};
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// The Messages API requires `max_tokens`; used when the request leaves it unset.
const DEFAULT_MAX_TOKENS: u32 = 1024;

/// Claude LLM client.
pub struct ClaudeClient {
    base_url: String,
    api_key: String,
    api_version: String,
    client: reqwest::Client,
}

impl ClaudeClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            api_version: ANTHROPIC_VERSION.to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = api_version.into();
        self
    }

    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    /// Bound every request made by this client.
    pub fn with_timeout(mut self, timeout: Duration) -> AppResult<Self> {
        self.client = super::http_client(timeout)?;
        Ok(self)
    }

    fn build_request_body(&self, request: &LlmRequest) -> Value {
        let messages: Vec<Value> = request
            .conversation()
            .map(|m| json!({"role": m.role.as_str(), "content": m.content}))
            .collect();

        let mut body = json!({
            "model": request.model,
            "max_tokens": request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            "messages": messages,
        });

        if let Some(system) = request.system_text() {
            body["system"] = Value::String(system);
        }
        if let Some(temperature) = request.temperature {
            body["temperature"] = json!(temperature);
        }

        body
    }

    /// Parse a Messages API body. Without a `content` array the body is kept raw.
    fn parse_response(body: Value, requested_model: &str) -> LlmResponse {
        let model = body["model"]
            .as_str()
            .unwrap_or(requested_model)
            .to_string();

        let usage = LlmUsage::new(
            body["usage"]["input_tokens"].as_u64().unwrap_or(0) as u32,
            body["usage"]["output_tokens"].as_u64().unwrap_or(0) as u32,
        );

        let blocks: Option<Vec<ContentBlock>> = body["content"]
            .as_array()
            .map(|blocks| blocks.iter().map(parse_block).collect());
        let content = match blocks {
            Some(blocks) => ReplyContent::Blocks(blocks),
            None => ReplyContent::Raw(body),
        };

        LlmResponse {
            content,
            model,
            usage,
        }
    }
}

fn parse_block(block: &Value) -> ContentBlock {
    match (block["type"].as_str(), block["text"].as_str()) {
        (Some("text"), Some(text)) => ContentBlock::Text {
            text: text.to_string(),
        },
        _ => {
            tracing::debug!("Keeping non-text content block: {}", block);
            ContentBlock::Other(block.clone())
        }
    }
}

#[async_trait::async_trait]
impl LlmClient for ClaudeClient {
    fn provider_name(&self) -> &str {
        "claude"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        let url = format!("{}/messages", self.base_url);
        tracing::info!(model = %request.model, "Sending completion request to Claude");

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", &self.api_version)
            .json(&self.build_request_body(request))
            .send()
            .await
            .map_err(|e| AppError::Llm(format!("Request to Claude failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(super::http_error("Claude", response).await);
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| AppError::Llm(format!("Failed to parse Claude response: {}", e)))?;

        tracing::debug!("Claude response: {}", body);

        Ok(Self::parse_response(body, &request.model))
    }
}
