//! On-disk layout of the index storage root.
//!
//! ```text
//! <indexes_dir>/
//!   <index-name>/
//!     index.sqlite   serialized passages and embeddings
//!     config.yaml    optional manifest (embedding provider, model, dimension)
//! ```

use crate::types::IndexManifest;
use filings_core::{AppError, AppResult};
use std::fs;
use std::path::{Path, PathBuf};

/// File that marks a directory as an index.
pub const INDEX_FILE_NAME: &str = "index.sqlite";

/// Optional manifest next to the index file.
pub const MANIFEST_FILE_NAME: &str = "config.yaml";

/// Get the directory of a named index.
pub fn get_index_dir(root: &Path, index_name: &str) -> PathBuf {
    root.join(index_name)
}

/// Get the path to an index's serialized store.
pub fn get_index_path(root: &Path, index_name: &str) -> PathBuf {
    get_index_dir(root, index_name).join(INDEX_FILE_NAME)
}

/// Get the path to an index's manifest.
pub fn get_manifest_path(root: &Path, index_name: &str) -> PathBuf {
    get_index_dir(root, index_name).join(MANIFEST_FILE_NAME)
}

/// Load an index manifest, if the index has one.
pub fn load_manifest(root: &Path, index_name: &str) -> AppResult<Option<IndexManifest>> {
    let manifest_path = get_manifest_path(root, index_name);

    if !manifest_path.exists() {
        tracing::debug!("No manifest for index '{}'", index_name);
        return Ok(None);
    }

    let content = fs::read_to_string(&manifest_path).map_err(|e| {
        AppError::Knowledge(format!(
            "Failed to read manifest at {:?}: {}",
            manifest_path, e
        ))
    })?;

    let manifest: IndexManifest = serde_yaml::from_str(&content).map_err(|e| {
        AppError::Knowledge(format!(
            "Failed to parse manifest at {:?}: {}",
            manifest_path, e
        ))
    })?;

    Ok(Some(manifest))
}
