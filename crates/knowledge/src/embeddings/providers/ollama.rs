//! Ollama embedding provider.
//!
//! Questions are embedded through Ollama's local `/api/embeddings` endpoint
//! with the same model that was used to build the indexes (by default
//! `nomic-embed-text`, 768 dimensions). Requests are not retried; a failure
//! surfaces to the caller as a failed turn.

use crate::embeddings::EmbeddingProvider;
use async_trait::async_trait;
use filings_core::config::DEFAULT_EMBEDDING_TIMEOUT_SECS;
use filings_core::{AppError, AppResult};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
const EMBEDDING_ENDPOINT: &str = "/api/embeddings";

/// Ollama embedding provider using the local API.
#[derive(Debug, Clone)]
pub struct OllamaProvider {
    client: Client,
    base_url: String,
    model: String,
    dimensions: usize,
    timeout: Duration,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: String,
}

impl OllamaProvider {
    /// Create a provider; no request is made until the first embedding.
    pub fn new(model: impl Into<String>, dimensions: usize) -> AppResult<Self> {
        let timeout = Duration::from_secs(DEFAULT_EMBEDDING_TIMEOUT_SECS);
        Ok(Self {
            client: http_client(timeout)?,
            base_url: DEFAULT_OLLAMA_URL.to_string(),
            model: model.into(),
            dimensions,
            timeout,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Bound every embedding request made by this provider.
    pub fn with_timeout(mut self, timeout: Duration) -> AppResult<Self> {
        self.client = http_client(timeout)?;
        self.timeout = timeout;
        Ok(self)
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    #[instrument(skip(self, text), fields(text_len = text.len(), model = %self.model))]
    async fn embed_single(&self, text: &str) -> AppResult<Vec<f32>> {
        let url = format!("{}{}", self.base_url, EMBEDDING_ENDPOINT);
        debug!("Sending embedding request to {}", url);

        let response = self
            .client
            .post(&url)
            .json(&EmbeddingRequest {
                model: &self.model,
                prompt: text,
            })
            .send()
            .await
            .map_err(|e| {
                AppError::Knowledge(format!(
                    "Ollama not available at {}: {}. Ensure it is running and run: ollama pull {}",
                    self.base_url, e, self.model
                ))
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            let message = serde_json::from_str::<ErrorResponse>(&error_text)
                .map(|e| e.error)
                .unwrap_or(error_text);
            return Err(AppError::Knowledge(format!(
                "Ollama embeddings error ({}): {}",
                status, message
            )));
        }

        let body: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| AppError::Knowledge(format!("Failed to parse Ollama response: {}", e)))?;

        check_dimensions(&body.embedding, self.dimensions)?;
        Ok(body.embedding)
    }
}

fn http_client(timeout: Duration) -> AppResult<Client> {
    Client::builder().timeout(timeout).build().map_err(|e| {
        AppError::Knowledge(format!("Failed to create HTTP client for Ollama: {}", e))
    })
}

fn check_dimensions(embedding: &[f32], expected: usize) -> AppResult<()> {
    if embedding.len() != expected {
        return Err(AppError::Knowledge(format!(
            "Unexpected embedding dimensions: got {}, expected {}",
            embedding.len(),
            expected
        )));
    }
    Ok(())
}

#[async_trait]
impl EmbeddingProvider for OllamaProvider {
    fn provider_name(&self) -> &str {
        "ollama"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
        if text.trim().is_empty() {
            return Err(AppError::Knowledge("Cannot embed empty text".to_string()));
        }
        self.embed_single(text).await
    }

    // The endpoint takes one prompt per call.
    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.embed(text).await?);
        }
        Ok(embeddings)
    }
}
