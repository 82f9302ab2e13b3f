//! Retrieval type definitions.

use crate::vector_index::VectorStore;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Per-index manifest, read from `<root>/<index>/config.yaml` when present.
///
/// Records how the index was embedded so that a mismatching query embedder
/// is caught at load time instead of producing meaningless scores.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexManifest {
    /// Display name, informational only; the directory name is authoritative
    #[serde(default)]
    pub name: Option<String>,

    /// Embedding provider used at build time
    #[serde(default)]
    pub provider: Option<String>,

    /// Embedding model used at build time
    #[serde(default)]
    pub model: Option<String>,

    /// Embedding vector dimension
    #[serde(default)]
    pub embedding_dim: Option<usize>,
}

/// A stored passage with its embedding, as read from `index.sqlite`.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredChunk {
    pub id: String,
    pub source_id: String,
    pub position: u32,
    pub text: String,
    pub embedding: Vec<f32>,
}

/// One nearest-neighbour result from a single store.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub text: String,
    pub score: f32,
}

impl SearchHit {
    pub fn new(text: impl Into<String>, score: f32) -> Self {
        Self {
            text: text.into(),
            score,
        }
    }
}

/// A loaded, searchable index.
///
/// Handles are created once when the user's selection is resolved and are
/// only read afterwards, so cloning shares the same backing store.
#[derive(Clone)]
pub struct IndexHandle {
    pub name: String,
    pub store: Arc<dyn VectorStore>,
}

impl IndexHandle {
    pub fn new(name: impl Into<String>, store: Arc<dyn VectorStore>) -> Self {
        Self {
            name: name.into(),
            store,
        }
    }
}

impl fmt::Debug for IndexHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexHandle")
            .field("name", &self.name)
            .field("passages", &self.store.len())
            .finish()
    }
}
