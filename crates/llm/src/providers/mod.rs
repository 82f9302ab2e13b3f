//! Chat provider implementations.

pub mod claude;
pub mod ollama;

pub use claude::ClaudeClient;
pub use ollama::OllamaClient;

use filings_core::{AppError, AppResult};
use std::time::Duration;

/// Build an HTTP client whose requests give up after `timeout`.
pub(crate) fn http_client(timeout: Duration) -> AppResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| AppError::Llm(format!("Failed to create HTTP client: {}", e)))
}

/// Turn a non-success HTTP response into an `AppError::Llm`.
pub(crate) async fn http_error(provider: &str, response: reqwest::Response) -> AppError {
    let status = response.status();
    let error_text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    AppError::Llm(format!("{} API error ({}): {}", provider, status, error_text))
}
