//! SQLite-backed flat vector index.
//!
//! An index file holds a `chunks` table of passages with little-endian `f32`
//! embeddings. The whole table is read into memory at load time; searches
//! are an exhaustive cosine scan over it.

use crate::embeddings::EmbeddingProvider;
use crate::types::{SearchHit, StoredChunk};
use crate::vector_index::VectorStore;
use async_trait::async_trait;
use filings_core::{AppError, AppResult};
use rusqlite::{Connection, OpenFlags};
use std::path::Path;
use std::sync::Arc;

/// Highest `PRAGMA user_version` this reader understands.
pub const SCHEMA_VERSION: i64 = 1;

const REQUIRED_COLUMNS: &[&str] = &["id", "source_id", "position", "text", "embedding"];

/// Open an index file read-only.
pub fn open_index(db_path: &Path) -> AppResult<Connection> {
    if !db_path.is_file() {
        return Err(AppError::Knowledge(format!(
            "index file {:?} does not exist",
            db_path
        )));
    }

    let conn = Connection::open_with_flags(
        db_path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .map_err(|e| AppError::Knowledge(format!("Failed to open SQLite index: {}", e)))?;

    check_schema(&conn)?;

    tracing::debug!("Opened SQLite index at {:?}", db_path);
    Ok(conn)
}

/// Verify the schema version and the `chunks` columns.
pub fn check_schema(conn: &Connection) -> AppResult<()> {
    let version: i64 = conn
        .pragma_query_value(None, "user_version", |row| row.get(0))
        .map_err(|e| AppError::Knowledge(format!("Not a readable index: {}", e)))?;

    if version > SCHEMA_VERSION {
        return Err(AppError::Knowledge(format!(
            "Unsupported index schema version {} (supported up to {})",
            version, SCHEMA_VERSION
        )));
    }

    let mut stmt = conn
        .prepare("SELECT name FROM pragma_table_info('chunks')")
        .map_err(|e| AppError::Knowledge(format!("Failed to inspect schema: {}", e)))?;
    let columns: Vec<String> = stmt
        .query_map([], |row| row.get(0))
        .and_then(|rows| rows.collect())
        .map_err(|e| AppError::Knowledge(format!("Failed to inspect schema: {}", e)))?;

    if columns.is_empty() {
        return Err(AppError::Knowledge(
            "Index has no 'chunks' table".to_string(),
        ));
    }

    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|required| !columns.iter().any(|c| c == required))
        .collect();
    if !missing.is_empty() {
        return Err(AppError::Knowledge(format!(
            "Index schema mismatch: 'chunks' lacks column(s) {}",
            missing.join(", ")
        )));
    }

    Ok(())
}

/// Read every chunk in storage order.
pub fn load_chunks(conn: &Connection) -> AppResult<Vec<StoredChunk>> {
    let mut stmt = conn
        .prepare("SELECT id, source_id, position, text, embedding FROM chunks ORDER BY rowid")
        .map_err(|e| AppError::Knowledge(format!("Failed to prepare query: {}", e)))?;

    let rows: Vec<(String, String, i64, String, Vec<u8>)> = stmt
        .query_map([], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
        })
        .and_then(|rows| rows.collect())
        .map_err(|e| AppError::Knowledge(format!("Failed to read chunks: {}", e)))?;

    rows.into_iter()
        .map(|(id, source_id, position, text, bytes)| {
            let embedding = bytes_to_embedding(&bytes).map_err(|e| {
                AppError::Knowledge(format!("Chunk '{}' has a corrupt embedding: {}", id, e))
            })?;
            Ok(StoredChunk {
                id,
                source_id,
                position: position.max(0) as u32,
                text,
                embedding,
            })
        })
        .collect()
}

/// Convert embedding vector to bytes for storage.
pub fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// Convert stored bytes back to an embedding vector.
pub fn bytes_to_embedding(bytes: &[u8]) -> AppResult<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(AppError::Knowledge(format!(
            "Invalid embedding bytes length {}",
            bytes.len()
        )));
    }

    Ok(bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}

/// Calculate cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

/// In-memory exhaustive index over loaded chunks.
#[derive(Debug)]
pub struct FlatIndex {
    chunks: Vec<StoredChunk>,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl FlatIndex {
    /// Build from chunks whose embeddings all have the embedder's dimension.
    pub fn new(chunks: Vec<StoredChunk>, embedder: Arc<dyn EmbeddingProvider>) -> AppResult<Self> {
        let expected = embedder.dimensions();
        if let Some(bad) = chunks.iter().find(|c| c.embedding.len() != expected) {
            return Err(AppError::Knowledge(format!(
                "Embedding dimension mismatch: chunk '{}' has {}, provider '{}' produces {}",
                bad.id,
                bad.embedding.len(),
                embedder.model_name(),
                expected
            )));
        }

        Ok(Self { chunks, embedder })
    }

    /// Open and fully read an index file.
    pub fn open(db_path: &Path, embedder: Arc<dyn EmbeddingProvider>) -> AppResult<Self> {
        let conn = open_index(db_path)?;
        let chunks = load_chunks(&conn)?;
        Self::new(chunks, embedder)
    }
}

#[async_trait]
impl VectorStore for FlatIndex {
    async fn search(&self, query: &str, top_k: usize) -> AppResult<Vec<SearchHit>> {
        if top_k == 0 || self.chunks.is_empty() {
            return Ok(Vec::new());
        }

        let query_embedding = self.embedder.embed(query).await?;
        self.search_embedded(query, &query_embedding, top_k).await
    }

    fn query_embedder(&self) -> Option<&Arc<dyn EmbeddingProvider>> {
        Some(&self.embedder)
    }

    async fn search_embedded(
        &self,
        _query: &str,
        embedding: &[f32],
        top_k: usize,
    ) -> AppResult<Vec<SearchHit>> {
        if top_k == 0 || self.chunks.is_empty() {
            return Ok(Vec::new());
        }

        if embedding.len() != self.embedder.dimensions() {
            return Err(AppError::Knowledge(format!(
                "Query embedding has {} dimensions, index expects {}",
                embedding.len(),
                self.embedder.dimensions()
            )));
        }

        let mut scored: Vec<(usize, f32)> = self
            .chunks
            .iter()
            .enumerate()
            .map(|(i, chunk)| (i, cosine_similarity(embedding, &chunk.embedding)))
            .collect();

        // Stable: equal scores keep storage order.
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(top_k);

        tracing::debug!(
            "Scored {} chunks, returning {} (requested top-{})",
            self.chunks.len(),
            scored.len(),
            top_k
        );

        Ok(scored
            .into_iter()
            .map(|(i, score)| SearchHit::new(self.chunks[i].text.clone(), score))
            .collect())
    }

    fn len(&self) -> usize {
        self.chunks.len()
    }
}
