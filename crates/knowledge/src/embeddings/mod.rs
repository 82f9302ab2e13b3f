//! Embedding backends shared by every loaded index.
//!
//! The same provider embeds the stored passages (at build time, elsewhere)
//! and the questions (here), so a loaded index is only usable when its
//! recorded model and dimensions agree with the configured provider.

pub mod provider;
pub mod providers;

pub use provider::{create_provider, EmbeddingProvider};
