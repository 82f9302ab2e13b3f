//! Multi-index retrieval and context assembly.

use crate::embeddings::EmbeddingProvider;
use crate::types::IndexHandle;
use filings_core::{AppError, AppResult};
use futures::future::try_join_all;
use std::sync::Arc;

/// Default number of passages taken from each index.
pub const DEFAULT_TOP_K: usize = 5;

/// Prefix written before every passage in the context text.
pub const PASSAGE_DELIMITER: &str = "\n\n---\n";

/// Context text used when no selected index returned anything.
pub const NO_CONTEXT_SENTINEL: &str = "No relevant context found in the selected indexes.";

/// A passage returned for one question from one index.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievedPassage {
    pub text: String,
    pub source_index: String,
    /// 0-based position within that index's result list.
    pub rank: usize,
}

/// All passages retrieved for one question, merged in selection order.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextBlock {
    pub text: String,
    pub passages: Vec<RetrievedPassage>,
}

impl ContextBlock {
    fn from_passages(passages: Vec<RetrievedPassage>) -> Self {
        let text = if passages.is_empty() {
            NO_CONTEXT_SENTINEL.to_string()
        } else {
            passages
                .iter()
                .map(|p| format!("{}{}", PASSAGE_DELIMITER, p.text))
                .collect()
        };

        Self { text, passages }
    }

    /// Whether nothing was retrieved and the text is the sentinel.
    pub fn is_sentinel(&self) -> bool {
        self.passages.is_empty()
    }
}

/// Search every index for `question` and merge the results.
///
/// Each index contributes up to `k` passages in its own rank order, so the
/// total can reach `k * indexes.len()`. Searches run concurrently but the
/// merge always follows the order of `indexes`; no deduplication is done
/// across indexes. The question is embedded once per distinct embedding
/// provider, not once per index.
pub async fn retrieve(question: &str, indexes: &[IndexHandle], k: usize) -> AppResult<ContextBlock> {
    let embeddings = embed_question(question, indexes).await?;

    let searches = indexes.iter().zip(embeddings).map(|(handle, embedding)| async move {
        let hits = match embedding {
            Some(embedding) => handle.store.search_embedded(question, &embedding, k).await,
            None => handle.store.search(question, k).await,
        };
        hits
            .map(|hits| (handle.name.as_str(), hits))
            .map_err(|e| {
                tracing::error!("Search failed for index '{}': {}", handle.name, e);
                AppError::Knowledge(format!("Search failed for index '{}': {}", handle.name, e))
            })
    });

    // try_join_all yields results in input order regardless of completion order.
    let per_index = try_join_all(searches).await?;

    let mut passages = Vec::new();
    for (name, hits) in per_index {
        tracing::debug!("Index '{}' returned {} passage(s)", name, hits.len());
        passages.extend(
            hits.into_iter()
                .take(k)
                .enumerate()
                .map(|(rank, hit)| RetrievedPassage {
                    text: hit.text,
                    source_index: name.to_string(),
                    rank,
                }),
        );
    }

    let block = ContextBlock::from_passages(passages);
    if block.is_sentinel() {
        tracing::info!("No passages retrieved from {} index(es)", indexes.len());
    } else {
        tracing::info!(
            "Retrieved {} passage(s) from {} index(es)",
            block.passages.len(),
            indexes.len()
        );
    }

    Ok(block)
}

/// Embed `question` for every store that searches by vector, sharing one
/// embedding among stores with the same provider.
async fn embed_question(
    question: &str,
    indexes: &[IndexHandle],
) -> AppResult<Vec<Option<Arc<[f32]>>>> {
    let mut computed: Vec<(&Arc<dyn EmbeddingProvider>, Arc<[f32]>)> = Vec::new();
    let mut per_index = Vec::with_capacity(indexes.len());

    for handle in indexes {
        let Some(embedder) = handle.store.query_embedder() else {
            per_index.push(None);
            continue;
        };

        let existing = computed
            .iter()
            .find(|(known, _)| Arc::ptr_eq(*known, embedder))
            .map(|(_, embedding)| Arc::clone(embedding));

        let embedding = match existing {
            Some(embedding) => embedding,
            None => {
                let embedding: Arc<[f32]> = embedder
                    .embed(question)
                    .await
                    .map_err(|e| {
                        tracing::error!("Could not embed the question: {}", e);
                        AppError::Knowledge(format!("Could not embed the question: {}", e))
                    })?
                    .into();
                computed.push((embedder, Arc::clone(&embedding)));
                embedding
            }
        };
        per_index.push(Some(embedding));
    }

    tracing::debug!(
        "Embedded question with {} provider(s) for {} index(es)",
        computed.len(),
        indexes.len()
    );
    Ok(per_index)
}
