//! Retrieval followed by synthesis over a fixed index selection.

use crate::rag::synthesize::AnswerSynthesizer;
use crate::rag::types::RagAnswer;
use crate::retrieval::{self, DEFAULT_TOP_K};
use crate::types::IndexHandle;
use filings_core::AppResult;

/// The per-session answering chain.
///
/// Holds the indexes resolved at startup; they do not change for the
/// lifetime of the pipeline.
#[derive(Clone)]
pub struct RagPipeline {
    indexes: Vec<IndexHandle>,
    synthesizer: AnswerSynthesizer,
    top_k: usize,
}

impl RagPipeline {
    pub fn new(indexes: Vec<IndexHandle>, synthesizer: AnswerSynthesizer) -> Self {
        Self {
            indexes,
            synthesizer,
            top_k: DEFAULT_TOP_K,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn index_names(&self) -> Vec<&str> {
        self.indexes.iter().map(|h| h.name.as_str()).collect()
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Retrieve context for `question` and synthesize an answer.
    pub async fn ask(&self, question: &str) -> AppResult<RagAnswer> {
        tracing::info!(
            "Answering over {} index(es) with top-{}",
            self.indexes.len(),
            self.top_k
        );

        let context = retrieval::retrieve(question, &self.indexes, self.top_k).await?;
        let answer = self.synthesizer.synthesize(question, &context.text).await?;

        Ok(RagAnswer {
            answer,
            passages: context.passages,
        })
    }
}
