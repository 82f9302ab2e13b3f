//! LLM provider factory.
//!
//! Creates the chat client for the configured provider from its connection
//! settings.

use crate::client::LlmClient;
use crate::providers::{ClaudeClient, OllamaClient};
use crate::types::ProviderType;
use filings_core::{AppError, AppResult};
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// Connection settings for one chat client.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Custom endpoint URL
    pub endpoint: Option<String>,
    /// API key (required by Claude)
    pub api_key: Option<String>,
    /// `anthropic-version` header (Claude only)
    pub api_version: Option<String>,
    /// Upper bound for each HTTP request
    pub timeout: Duration,
}

impl ClientOptions {
    pub fn new(timeout: Duration) -> Self {
        Self {
            endpoint: None,
            api_key: None,
            api_version: None,
            timeout,
        }
    }

    pub fn with_endpoint(mut self, endpoint: Option<String>) -> Self {
        self.endpoint = endpoint;
        self
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key;
        self
    }

    pub fn with_api_version(mut self, api_version: Option<String>) -> Self {
        self.api_version = api_version;
        self
    }
}

/// Create an LLM client based on the provider name.
///
/// # Arguments
/// * `provider` - Provider identifier ("claude", "anthropic", "ollama")
/// * `options` - Endpoint, credentials, API version and request timeout
///
/// # Errors
/// Returns `AppError::Config` if the provider is unknown or its key is missing.
pub fn create_client(provider: &str, options: &ClientOptions) -> AppResult<Arc<dyn LlmClient>> {
    match ProviderType::parse(provider) {
        Some(ProviderType::Ollama) => Ok(Arc::new(build_ollama(options)?)),
        Some(ProviderType::Claude) => Ok(Arc::new(build_claude(options)?)),
        None => Err(AppError::Config(format!("Unknown provider: {}", provider))),
    }
}

fn build_ollama(options: &ClientOptions) -> AppResult<OllamaClient> {
    if let Some(version) = options.api_version.as_deref() {
        tracing::warn!("apiVersion '{}' is ignored by the ollama provider", version);
    }
    let base_url = options.endpoint.as_deref().unwrap_or(DEFAULT_OLLAMA_URL);
    OllamaClient::with_base_url(base_url).with_timeout(options.timeout)
}

fn build_claude(options: &ClientOptions) -> AppResult<ClaudeClient> {
    let api_key = options
        .api_key
        .as_deref()
        .ok_or_else(|| AppError::Config("Claude provider requires API key".to_string()))?;

    let mut client = ClaudeClient::new(api_key).with_timeout(options.timeout)?;
    if let Some(endpoint) = options.endpoint.as_deref() {
        client = client.with_base_url(endpoint);
    }
    if let Some(version) = options.api_version.as_deref() {
        client = client.with_api_version(version);
    }
    Ok(client)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> ClientOptions {
        ClientOptions::new(Duration::from_secs(5))
    }

    #[test]
    fn test_create_ollama_client() {
        let client = create_client("ollama", &options()).unwrap();
        assert_eq!(client.provider_name(), "ollama");
    }

    #[test]
    fn test_create_ollama_with_custom_endpoint() {
        let options = options().with_endpoint(Some("http://localhost:8080".to_string()));
        assert!(create_client("ollama", &options).is_ok());
    }

    #[test]
    fn test_create_claude_client() {
        let options = options().with_api_key(Some("sk-test".to_string()));
        let client = create_client("anthropic", &options).unwrap();
        assert_eq!(client.provider_name(), "claude");
    }

    #[test]
    fn test_claude_uses_configured_api_version() {
        let options = options()
            .with_api_key(Some("sk-test".to_string()))
            .with_api_version(Some("2099-01-01".to_string()));
        let client = build_claude(&options).unwrap();
        assert_eq!(client.api_version(), "2099-01-01");
    }

    #[test]
    fn test_claude_default_api_version() {
        let options = options().with_api_key(Some("sk-test".to_string()));
        let client = build_claude(&options).unwrap();
        assert_eq!(client.api_version(), "2023-06-01");
    }

    #[test]
    fn test_ollama_ignores_api_version() {
        let options = options().with_api_version(Some("2099-01-01".to_string()));
        assert!(create_client("ollama", &options).is_ok());
    }

    #[test]
    fn test_claude_requires_api_key() {
        match create_client("claude", &options()) {
            Err(err) => assert!(err.to_string().contains("Claude provider requires API key")),
            Ok(_) => panic!("Expected error for Claude without API key"),
        }
    }

    #[test]
    fn test_unknown_provider() {
        match create_client("unknown", &options()) {
            Err(err) => assert!(err.to_string().contains("Unknown provider")),
            Ok(_) => panic!("Expected error for unknown provider"),
        }
    }
}
