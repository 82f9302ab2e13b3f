//! Index registry: discovery, selection and loading of stored indexes.

use crate::config::{self, INDEX_FILE_NAME};
use crate::embeddings::EmbeddingProvider;
use crate::index::FlatIndex;
use crate::types::{IndexHandle, IndexManifest};
use filings_core::{AppError, AppResult, IndexLoadFailure};
use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

/// How many indexes a selection may contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMode {
    /// Exactly one index.
    Single,
    /// One or more indexes, searched together.
    Multi,
}

/// Registry over a storage root with one subdirectory per index.
#[derive(Debug, Clone)]
pub struct IndexRegistry {
    root: PathBuf,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl IndexRegistry {
    pub fn new(root: impl Into<PathBuf>, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            root: root.into(),
            embedder,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Names of the subdirectories of the root that hold an index file.
    ///
    /// A missing or unreadable root is `StorageUnavailable`. An empty set is
    /// returned as-is; see [`Self::require_available_indexes`].
    pub fn list_available_indexes(&self) -> AppResult<BTreeSet<String>> {
        let unavailable = || AppError::StorageUnavailable(self.root.display().to_string());

        if !self.root.is_dir() {
            tracing::warn!("Index storage root {:?} is missing", self.root);
            return Err(unavailable());
        }

        let mut names = BTreeSet::new();
        for entry in WalkDir::new(&self.root)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true)
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if e.depth() == 0 => {
                    tracing::warn!("Cannot read index storage root {:?}: {}", self.root, e);
                    return Err(unavailable());
                }
                Err(e) => {
                    tracing::warn!("Skipping unreadable entry in {:?}: {}", self.root, e);
                    continue;
                }
            };

            if !entry.file_type().is_dir() || !entry.path().join(INDEX_FILE_NAME).is_file() {
                continue;
            }

            match entry.file_name().to_str() {
                Some(name) => {
                    names.insert(name.to_string());
                }
                None => tracing::warn!("Skipping index with non UTF-8 name: {:?}", entry.path()),
            }
        }

        tracing::debug!("Found {} index(es) under {:?}", names.len(), self.root);
        Ok(names)
    }

    /// Like [`Self::list_available_indexes`], but an empty root is an error.
    pub fn require_available_indexes(&self) -> AppResult<BTreeSet<String>> {
        let names = self.list_available_indexes()?;
        if names.is_empty() {
            return Err(AppError::StorageUnavailable(
                self.root.display().to_string(),
            ));
        }
        Ok(names)
    }

    /// Validate a selection and load every selected index.
    ///
    /// All indexes are attempted even after a failure so that every broken
    /// index is reported at once; any failure fails the whole selection.
    pub fn resolve_selection(
        &self,
        mode: SearchMode,
        raw_selection: &[String],
    ) -> AppResult<Vec<IndexHandle>> {
        let available = self.require_available_indexes()?;
        let names = validate_selection(mode, raw_selection, &available)?;

        let mut handles = Vec::with_capacity(names.len());
        let mut failures = Vec::new();

        for name in names {
            match self.try_load(&name) {
                Ok(handle) => handles.push(handle),
                Err(cause) => {
                    let failure = IndexLoadFailure::new(name, cause);
                    tracing::error!("{}", failure);
                    failures.push(failure);
                }
            }
        }

        if !failures.is_empty() {
            return Err(AppError::IndexLoad(failures));
        }

        tracing::info!(
            "Loaded {} index(es): {}",
            handles.len(),
            handles
                .iter()
                .map(|h| h.name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );
        Ok(handles)
    }

    /// Load one named index with the shared embedding provider.
    pub fn load(&self, name: &str) -> AppResult<IndexHandle> {
        self.try_load(name)
            .map_err(|cause| AppError::index_load(name, cause))
    }

    fn try_load(&self, name: &str) -> Result<IndexHandle, String> {
        let manifest = config::load_manifest(&self.root, name).map_err(|e| e.to_string())?;
        if let Some(manifest) = &manifest {
            self.check_manifest(manifest)?;
        }

        let path = config::get_index_path(&self.root, name);
        let index = FlatIndex::open(&path, Arc::clone(&self.embedder)).map_err(|e| match e {
            AppError::Knowledge(message) => message,
            other => other.to_string(),
        })?;

        tracing::debug!("Loaded index '{}' from {:?}", name, path);
        Ok(IndexHandle::new(name, Arc::new(index)))
    }

    fn check_manifest(&self, manifest: &IndexManifest) -> Result<(), String> {
        if let Some(model) = manifest.model.as_deref() {
            if model != self.embedder.model_name() {
                return Err(format!(
                    "built with embedding model '{}' but '{}' is configured",
                    model,
                    self.embedder.model_name()
                ));
            }
        }

        if let Some(dim) = manifest.embedding_dim {
            if dim != self.embedder.dimensions() {
                return Err(format!(
                    "built with {}-dimensional embeddings but the configured model produces {}",
                    dim,
                    self.embedder.dimensions()
                ));
            }
        }

        Ok(())
    }
}

/// Normalize and check a raw selection against the available names.
///
/// Entries are trimmed, blanks dropped and duplicates removed keeping the
/// first occurrence, so the result preserves the user's order.
pub fn validate_selection(
    mode: SearchMode,
    raw_selection: &[String],
    available: &BTreeSet<String>,
) -> AppResult<Vec<String>> {
    let mut seen = HashSet::new();
    let names: Vec<String> = raw_selection
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .filter(|s| seen.insert(s.to_string()))
        .map(str::to_string)
        .collect();

    if names.is_empty() {
        return Err(AppError::EmptySelection);
    }

    if mode == SearchMode::Single && names.len() > 1 {
        return Err(AppError::InvalidSelection(format!(
            "single-index mode takes exactly one index, got {}",
            names.len()
        )));
    }

    let unknown: Vec<&str> = names
        .iter()
        .filter(|n| !available.contains(n.as_str()))
        .map(String::as_str)
        .collect();
    if !unknown.is_empty() {
        return Err(AppError::InvalidSelection(format!(
            "unknown index(es) {} (available: {})",
            unknown.join(", "),
            available.iter().cloned().collect::<Vec<_>>().join(", ")
        )));
    }

    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn available(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn raw(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_multi_dedupes_in_first_seen_order() {
        let names = validate_selection(
            SearchMode::Multi,
            &raw(&["msft", " aapl ", "msft", "aapl"]),
            &available(&["aapl", "msft"]),
        )
        .unwrap();
        assert_eq!(names, vec!["msft", "aapl"]);
    }

    #[test]
    fn test_blank_selection_is_empty() {
        let err = validate_selection(
            SearchMode::Multi,
            &raw(&["", "   "]),
            &available(&["aapl"]),
        )
        .unwrap_err();
        assert!(matches!(err, AppError::EmptySelection));
        assert!(err.is_recoverable());

        let err = validate_selection(SearchMode::Single, &[], &available(&["aapl"])).unwrap_err();
        assert!(matches!(err, AppError::EmptySelection));
    }

    #[test]
    fn test_single_requires_exactly_one() {
        let err = validate_selection(
            SearchMode::Single,
            &raw(&["aapl", "msft"]),
            &available(&["aapl", "msft"]),
        )
        .unwrap_err();
        assert!(matches!(err, AppError::InvalidSelection(_)));

        let names = validate_selection(
            SearchMode::Single,
            &raw(&["aapl", "aapl"]),
            &available(&["aapl", "msft"]),
        )
        .unwrap();
        assert_eq!(names, vec!["aapl"]);
    }

    #[test]
    fn test_unknown_name_rejected() {
        let err = validate_selection(
            SearchMode::Multi,
            &raw(&["aapl", "tsla"]),
            &available(&["aapl", "msft"]),
        )
        .unwrap_err();
        assert!(err.is_recoverable());
        assert!(err.to_string().contains("tsla"));
        assert!(!err.to_string().contains("unknown index(es) aapl"));
    }
}
