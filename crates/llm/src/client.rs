//! LLM client abstraction and request/response types.
//!
//! The answering model is a single opaque request/response call. Replies
//! come back in provider-specific shapes, so the response carries a tagged
//! [`ReplyContent`] with one way to get text out of it:
//! [`LlmResponse::extract_text`].

use filings_core::AppResult;
use serde::{Deserialize, Serialize};

/// Message role understood by every provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// A role-tagged chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// LLM completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmRequest {
    /// Ordered messages; system messages come first
    pub messages: Vec<ChatMessage>,

    /// Model identifier (e.g., "llama3.2", "claude-sonnet-4-20250514")
    pub model: String,

    /// Maximum tokens to generate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Temperature for sampling (0.0 - 2.0)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

impl LlmRequest {
    /// Create a new LLM request with required fields.
    pub fn new(messages: Vec<ChatMessage>, model: impl Into<String>) -> Self {
        Self {
            messages,
            model: model.into(),
            max_tokens: None,
            temperature: None,
        }
    }

    /// Set the maximum tokens to generate.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Set the temperature for sampling.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Concatenated system messages, for providers with a top-level system field.
    pub fn system_text(&self) -> Option<String> {
        let parts: Vec<&str> = self
            .messages
            .iter()
            .filter(|m| m.role == Role::System)
            .map(|m| m.content.as_str())
            .collect();

        if parts.is_empty() {
            None
        } else {
            Some(parts.join("\n\n"))
        }
    }

    /// Messages that are not system messages, in order.
    pub fn conversation(&self) -> impl Iterator<Item = &ChatMessage> {
        self.messages.iter().filter(|m| m.role != Role::System)
    }
}

/// One block of a multi-part reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContentBlock {
    Text { text: String },
    Other(serde_json::Value),
}

/// The reply payload as the provider shaped it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ReplyContent {
    /// A single text body.
    Text(String),
    /// A list of typed blocks; only text blocks carry prose.
    Blocks(Vec<ContentBlock>),
    /// A body whose shape was not recognised.
    Raw(serde_json::Value),
}

/// LLM completion response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResponse {
    /// The reply payload
    pub content: ReplyContent,

    /// Model that generated the response
    pub model: String,

    /// Usage statistics
    #[serde(default)]
    pub usage: LlmUsage,
}

impl LlmResponse {
    pub fn text(content: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            content: ReplyContent::Text(content.into()),
            model: model.into(),
            usage: LlmUsage::default(),
        }
    }

    /// Reply as trimmed plain text.
    ///
    /// Text is taken from the body or from the text blocks. When the reply
    /// carries no text at all, the whole structure is rendered as JSON
    /// instead, so a turn never fails just because of an odd shape.
    pub fn extract_text(&self) -> String {
        match &self.content {
            ReplyContent::Text(text) => text.trim().to_string(),
            ReplyContent::Blocks(blocks) => {
                let texts: Vec<&str> = blocks
                    .iter()
                    .filter_map(|b| match b {
                        ContentBlock::Text { text } => Some(text.as_str()),
                        ContentBlock::Other(_) => None,
                    })
                    .collect();

                if texts.is_empty() {
                    render_raw(&serde_json::to_value(blocks).unwrap_or_default())
                } else {
                    texts.join("\n").trim().to_string()
                }
            }
            ReplyContent::Raw(value) => render_raw(value),
        }
    }
}

fn render_raw(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.trim().to_string(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Token usage statistics.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LlmUsage {
    /// Tokens in the prompt
    #[serde(default)]
    pub prompt_tokens: u32,

    /// Tokens in the completion
    #[serde(default)]
    pub completion_tokens: u32,

    /// Total tokens used
    #[serde(default)]
    pub total_tokens: u32,
}

impl LlmUsage {
    /// Create usage stats from prompt and completion token counts.
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

/// Trait for chat providers.
///
/// Implementations hold no per-call mutable state and are shared across
/// turns behind an `Arc`.
#[async_trait::async_trait]
pub trait LlmClient: Send + Sync {
    /// Get the provider name (e.g., "ollama", "claude").
    fn provider_name(&self) -> &str;

    /// Perform a single non-streaming completion.
    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse>;
}
