//! Embedding provider trait and factory.

use super::providers::{mock::MockProvider, ollama::OllamaProvider};
use filings_core::config::EmbeddingSettings;
use filings_core::{AppError, AppResult};
use std::sync::Arc;
use std::time::Duration;

/// Trait for embedding providers.
///
/// One provider is shared by every loaded index, so implementations must be
/// safe to call from concurrent searches.
#[async_trait::async_trait]
pub trait EmbeddingProvider: Send + Sync + std::fmt::Debug {
    /// Get provider name (e.g., "mock", "ollama")
    fn provider_name(&self) -> &str;

    /// Get model identifier
    fn model_name(&self) -> &str;

    /// Get embedding dimensions
    fn dimensions(&self) -> usize;

    /// Generate embeddings for multiple texts in a batch.
    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>>;

    /// Generate embedding for a single text (convenience method).
    async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
        let mut results = self.embed_batch(&[text.to_string()]).await?;
        results
            .pop()
            .ok_or_else(|| AppError::Knowledge("No embedding returned".to_string()))
    }
}

/// Create the shared embedding provider from configuration.
pub fn create_provider(settings: &EmbeddingSettings) -> AppResult<Arc<dyn EmbeddingProvider>> {
    if settings.dimensions == 0 {
        return Err(AppError::Config(
            "Embedding dimensions must be greater than zero".to_string(),
        ));
    }

    match settings.provider.as_str() {
        "mock" => Ok(Arc::new(MockProvider::new(settings.dimensions))),

        "ollama" => {
            let mut provider = OllamaProvider::new(&settings.model, settings.dimensions)?
                .with_timeout(Duration::from_secs(settings.timeout_secs))?;
            if let Some(endpoint) = settings.endpoint.as_deref() {
                provider = provider.with_base_url(endpoint);
            }
            Ok(Arc::new(provider))
        }

        _ => Err(AppError::Config(format!(
            "Unknown embedding provider: '{}'. Supported providers: mock, ollama",
            settings.provider
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(provider: &str) -> EmbeddingSettings {
        EmbeddingSettings {
            provider: provider.to_string(),
            model: "nomic-embed-text".to_string(),
            dimensions: 384,
            endpoint: None,
            timeout_secs: 30,
        }
    }

    #[test]
    fn test_create_mock_provider() {
        let provider = create_provider(&settings("mock")).unwrap();
        assert_eq!(provider.provider_name(), "mock");
        assert_eq!(provider.model_name(), "trigram-v1");
        assert_eq!(provider.dimensions(), 384);
    }

    #[test]
    fn test_create_ollama_provider_does_not_connect() {
        let mut settings = settings("ollama");
        settings.endpoint = Some("http://127.0.0.1:9/".to_string());
        let provider = create_provider(&settings).unwrap();
        assert_eq!(provider.provider_name(), "ollama");
        assert_eq!(provider.model_name(), "nomic-embed-text");
    }

    #[test]
    fn test_create_unknown_provider() {
        let result = create_provider(&settings("gguf"));
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Unknown embedding provider"));
    }

    #[test]
    fn test_zero_dimensions_rejected() {
        let mut settings = settings("mock");
        settings.dimensions = 0;
        assert!(create_provider(&settings).is_err());
    }

    #[tokio::test]
    async fn test_provider_embed_single() {
        let provider = create_provider(&settings("mock")).unwrap();
        let embedding = provider.embed("net revenue grew").await.unwrap();
        assert_eq!(embedding.len(), 384);
    }
}
