//! Error types for the filings chat.
//!
//! This module defines a unified error enum that covers the orchestrator's
//! failure taxonomy (storage, selection, index loading, synthesis) as well as
//! the ambient configuration, I/O, LLM and serialization errors.

use std::fmt;

use thiserror::Error;

/// Unified error type for the filings chat.
///
/// All functions in the application return `Result<T, AppError>`.
/// Every variant renders as a human-readable message; no structured codes
/// cross the user-facing surface.
#[derive(Error, Debug)]
pub enum AppError {
    /// The index storage root is missing, unreadable, or holds no indexes.
    #[error("No indexes found in {0}. Please create one first.")]
    StorageUnavailable(String),

    /// The user selected no index (or only blank entries).
    #[error("Please select index(es) to proceed.")]
    EmptySelection,

    /// The user selected something the registry does not offer.
    #[error("Invalid index selection: {0}")]
    InvalidSelection(String),

    /// One or more selected indexes could not be deserialized.
    #[error("{}", render_load_failures(.0))]
    IndexLoad(Vec<IndexLoadFailure>),

    /// The answering model failed or returned nothing usable.
    #[error("Synthesis error: {0}")]
    Synthesis(String),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// LLM provider errors
    #[error("LLM error: {0}")]
    Llm(String),

    /// Retrieval and vector store errors
    #[error("Knowledge error: {0}")]
    Knowledge(String),

    /// Prompt system errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl AppError {
    /// Build an `IndexLoad` error for a single index.
    pub fn index_load(name: impl Into<String>, cause: impl Into<String>) -> Self {
        AppError::IndexLoad(vec![IndexLoadFailure::new(name, cause)])
    }

    /// Whether the user can fix this by choosing again, without restarting.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AppError::EmptySelection | AppError::InvalidSelection(_)
        )
    }
}

/// A single index that failed to load, with the reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexLoadFailure {
    pub name: String,
    pub cause: String,
}

impl IndexLoadFailure {
    pub fn new(name: impl Into<String>, cause: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cause: cause.into(),
        }
    }
}

impl fmt::Display for IndexLoadFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Could not load index '{}': {}", self.name, self.cause)
    }
}

fn render_load_failures(failures: &[IndexLoadFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_load_lists_every_failure() {
        let err = AppError::IndexLoad(vec![
            IndexLoadFailure::new("10k-2023", "missing index.sqlite"),
            IndexLoadFailure::new("10q-q1", "embedding dimension mismatch"),
        ]);

        let message = err.to_string();
        assert!(message.contains("Could not load index '10k-2023': missing index.sqlite"));
        assert!(message.contains("Could not load index '10q-q1': embedding dimension mismatch"));
    }

    #[test]
    fn test_recoverable_errors() {
        assert!(AppError::EmptySelection.is_recoverable());
        assert!(AppError::InvalidSelection("nope".to_string()).is_recoverable());
        assert!(!AppError::StorageUnavailable("indexes".to_string()).is_recoverable());
        assert!(!AppError::index_load("a", "b").is_recoverable());
    }

    #[test]
    fn test_storage_unavailable_message() {
        let err = AppError::StorageUnavailable("/tmp/indexes".to_string());
        assert_eq!(
            err.to_string(),
            "No indexes found in /tmp/indexes. Please create one first."
        );
    }
}
