//! Retrieval over pre-built filing indexes.
//!
//! The flow for one question is registry → retrieval → synthesis:
//! [`IndexRegistry`] discovers and loads the indexes the user selected,
//! [`retrieval::retrieve`] searches them and merges the passages into a
//! [`ContextBlock`], and [`AnswerSynthesizer`] asks the chat model for a
//! grounded answer. [`RagPipeline`] bundles the last two for a session.

pub mod config;
pub mod embeddings;
pub mod index;
pub mod rag;
pub mod registry;
pub mod retrieval;
pub mod types;
pub mod vector_index;

#[cfg(test)]
mod tests;

pub use embeddings::{create_provider, EmbeddingProvider};
pub use index::FlatIndex;
pub use rag::{AnswerSynthesizer, RagAnswer, RagPipeline, DEFAULT_SYNTHESIS_TIMEOUT};
pub use registry::{validate_selection, IndexRegistry, SearchMode};
pub use retrieval::{
    retrieve, ContextBlock, RetrievedPassage, DEFAULT_TOP_K, NO_CONTEXT_SENTINEL,
    PASSAGE_DELIMITER,
};
pub use types::{IndexHandle, IndexManifest, SearchHit, StoredChunk};
pub use vector_index::VectorStore;
