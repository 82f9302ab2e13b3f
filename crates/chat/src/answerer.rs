//! The answering seam between the conversation and the retrieval chain.

use async_trait::async_trait;
use filings_core::AppResult;
use filings_knowledge::RagPipeline;

/// Produces an answer for one question.
#[async_trait]
pub trait Answerer: Send + Sync {
    async fn answer(&self, question: &str) -> AppResult<String>;
}

#[async_trait]
impl Answerer for RagPipeline {
    async fn answer(&self, question: &str) -> AppResult<String> {
        let result = self.ask(question).await?;
        tracing::debug!("Answer grounded on {:?}", result.passages_per_index());
        Ok(result.answer)
    }
}
