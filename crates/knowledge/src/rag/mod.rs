//! RAG (Retrieval-Augmented Generation) answering.
//!
//! [`synthesize::AnswerSynthesizer`] turns a question plus merged context
//! into one model call; [`pipeline::RagPipeline`] chains retrieval over the
//! selected indexes into it.

pub mod pipeline;
pub mod synthesize;
pub mod types;

pub use pipeline::RagPipeline;
pub use synthesize::{AnswerSynthesizer, DEFAULT_SYNTHESIS_TIMEOUT};
pub use types::RagAnswer;
