//! Vector store abstraction for loaded indexes.

use crate::embeddings::EmbeddingProvider;
use crate::types::SearchHit;
use async_trait::async_trait;
use filings_core::AppResult;
use std::sync::Arc;

/// A read-only nearest-neighbour store.
///
/// Stores are shared between concurrent searches for the lifetime of the
/// session; implementations never mutate after construction.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Return up to `top_k` passages most similar to `query`, best first.
    ///
    /// The order of the returned hits is the rank order used downstream.
    async fn search(&self, query: &str, top_k: usize) -> AppResult<Vec<SearchHit>>;

    /// Embedding provider this store expects queries to be embedded with.
    ///
    /// Stores that return one let the caller embed a question once and share
    /// the vector across every store using the same provider.
    fn query_embedder(&self) -> Option<&Arc<dyn EmbeddingProvider>> {
        None
    }

    /// Search with `query` already embedded by [`VectorStore::query_embedder`].
    async fn search_embedded(
        &self,
        query: &str,
        _embedding: &[f32],
        top_k: usize,
    ) -> AppResult<Vec<SearchHit>> {
        self.search(query, top_k).await
    }

    /// Number of stored passages.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
