//! LLM integration crate for the filings chat.
//!
//! This crate provides a provider-agnostic abstraction for the answering
//! model: an ordered list of role-tagged messages goes in, a single reply
//! comes out. There is no streaming.
//!
//! # Providers
//! - **Ollama**: Local LLM runtime (default)
//! - **Claude**: Anthropic Messages API
//!
//! # Example
//! ```no_run
//! use filings_llm::{ChatMessage, LlmClient, LlmRequest, providers::OllamaClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = OllamaClient::new();
//! let request = LlmRequest::new(vec![ChatMessage::user("Hello, world!")], "llama3.2");
//! let response = client.complete(&request).await?;
//! println!("{}", response.extract_text());
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
pub mod providers;
pub mod types;

// Re-export main types
pub use client::{
    ChatMessage, ContentBlock, LlmClient, LlmRequest, LlmResponse, LlmUsage, ReplyContent, Role,
};
pub use factory::{create_client, ClientOptions};
pub use providers::{ClaudeClient, OllamaClient};
pub use types::ProviderType;
