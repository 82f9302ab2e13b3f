//! Offline embedding provider based on hashed character trigrams.

use crate::embeddings::provider::EmbeddingProvider;
use filings_core::AppResult;
use std::collections::HashMap;

/// Model name recorded in index manifests built with this provider.
pub const MOCK_MODEL: &str = "trigram-v1";

const STOP_WORDS: &[&str] = &[
    "the", "is", "at", "which", "on", "a", "an", "as", "are", "was", "were", "for", "to", "of",
    "in", "and", "or", "but", "with", "by", "from", "this", "that", "be", "have", "has", "had",
    "it", "its", "their", "they", "them", "what", "how", "did",
];

/// Deterministic provider for tests and air-gapped use.
///
/// Vectors depend only on the text: each content word contributes to the
/// buckets of its character trigrams and to one bucket for the whole word.
/// Texts sharing vocabulary end up close under cosine similarity, which is
/// enough to exercise ranking without a model server.
#[derive(Debug, Clone)]
pub struct MockProvider {
    dimensions: usize,
}

impl MockProvider {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }

    fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0f32; self.dimensions];
        let lower = text.to_lowercase();

        let mut word_freq: HashMap<&str, u32> = HashMap::new();
        for word in lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| w.chars().count() > 2 && !STOP_WORDS.contains(w))
        {
            *word_freq.entry(word).or_insert(0) += 1;
        }

        for (word, freq) in &word_freq {
            let chars: Vec<char> = word.chars().collect();
            for window in chars.windows(3) {
                let bucket = self.bucket(window.iter().collect::<String>().as_bytes(), 37);
                embedding[bucket] += (*freq as f32).sqrt();
            }
            embedding[self.bucket(word.as_bytes(), 31)] += *freq as f32;
        }

        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            embedding.iter_mut().for_each(|v| *v /= norm);
        }

        embedding
    }

    fn bucket(&self, bytes: &[u8], multiplier: u64) -> usize {
        let hash = bytes
            .iter()
            .fold(0u64, |acc, b| acc.wrapping_mul(multiplier).wrapping_add(*b as u64));
        (hash % self.dimensions as u64) as usize
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for MockProvider {
    fn provider_name(&self) -> &str {
        "mock"
    }

    fn model_name(&self) -> &str {
        MOCK_MODEL
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|text| self.embed_text(text)).collect())
    }
}
