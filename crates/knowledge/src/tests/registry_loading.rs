//! Tests for index discovery and fail-closed loading.

use super::fixtures::{chunk, write_index, write_manifest};
use crate::embeddings::providers::MockProvider;
use crate::embeddings::EmbeddingProvider;
use crate::registry::{IndexRegistry, SearchMode};
use filings_core::AppError;
use std::sync::Arc;
use tempfile::TempDir;

const DIM: usize = 8;

fn registry(root: &std::path::Path) -> IndexRegistry {
    IndexRegistry::new(root, Arc::new(MockProvider::new(DIM)))
}

fn unit(i: usize) -> Vec<f32> {
    let mut v = vec![0.0; DIM];
    v[i % DIM] = 1.0;
    v
}

fn names(v: &[&str]) -> Vec<String> {
    v.iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_missing_root_is_storage_unavailable() {
    let temp = TempDir::new().unwrap();
    let registry = registry(&temp.path().join("nope"));

    let err = registry.list_available_indexes().unwrap_err();
    assert!(matches!(err, AppError::StorageUnavailable(_)));
}

#[test]
fn test_empty_root_lists_nothing() {
    let temp = TempDir::new().unwrap();
    let registry = registry(temp.path());

    assert!(registry.list_available_indexes().unwrap().is_empty());

    let err = registry.require_available_indexes().unwrap_err();
    assert!(matches!(err, AppError::StorageUnavailable(_)));
    assert!(err.to_string().contains("Please create one first"));
}

#[test]
fn test_only_directories_with_index_file_are_listed() {
    let temp = TempDir::new().unwrap();
    write_index(temp.path(), "aapl", &[chunk("a", "apple", unit(0))]);
    write_index(temp.path(), "msft", &[]);
    std::fs::create_dir_all(temp.path().join("half-built")).unwrap();
    std::fs::write(temp.path().join("notes.txt"), "not an index").unwrap();

    let listed = registry(temp.path()).list_available_indexes().unwrap();
    assert_eq!(listed.into_iter().collect::<Vec<_>>(), vec!["aapl", "msft"]);
}

#[test]
fn test_resolve_loads_in_selection_order() {
    let temp = TempDir::new().unwrap();
    write_index(temp.path(), "aapl", &[chunk("a", "apple", unit(0))]);
    write_index(
        temp.path(),
        "msft",
        &[chunk("m1", "azure", unit(1)), chunk("m2", "xbox", unit(2))],
    );

    let handles = registry(temp.path())
        .resolve_selection(SearchMode::Multi, &names(&["msft", "aapl", "msft"]))
        .unwrap();

    assert_eq!(handles.len(), 2);
    assert_eq!(handles[0].name, "msft");
    assert_eq!(handles[0].store.len(), 2);
    assert_eq!(handles[1].name, "aapl");
}

#[test]
fn test_resolve_rejects_unknown_before_loading() {
    let temp = TempDir::new().unwrap();
    write_index(temp.path(), "aapl", &[]);

    let err = registry(temp.path())
        .resolve_selection(SearchMode::Single, &names(&["tsla"]))
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidSelection(_)));
}

#[test]
fn test_resolve_on_empty_root_is_storage_unavailable() {
    let temp = TempDir::new().unwrap();
    let err = registry(temp.path())
        .resolve_selection(SearchMode::Multi, &names(&["aapl"]))
        .unwrap_err();
    assert!(matches!(err, AppError::StorageUnavailable(_)));
}

#[test]
fn test_every_failure_is_reported() {
    let temp = TempDir::new().unwrap();
    write_index(temp.path(), "good", &[chunk("g", "fine", unit(0))]);
    write_index(temp.path(), "wrong-dim", &[chunk("w", "short", vec![1.0, 0.0])]);
    let corrupt = write_index(temp.path(), "corrupt", &[]);
    std::fs::write(&corrupt, b"this is not an sqlite database at all, not even close").unwrap();

    let err = registry(temp.path())
        .resolve_selection(
            SearchMode::Multi,
            &names(&["wrong-dim", "good", "corrupt"]),
        )
        .unwrap_err();

    match err {
        AppError::IndexLoad(failures) => {
            let failed: Vec<&str> = failures.iter().map(|f| f.name.as_str()).collect();
            assert_eq!(failed, vec!["wrong-dim", "corrupt"]);
            assert!(failures[0].to_string().starts_with("Could not load index 'wrong-dim': "));
        }
        other => panic!("expected IndexLoad, got {:?}", other),
    }
}

#[test]
fn test_manifest_model_mismatch_fails_load() {
    let temp = TempDir::new().unwrap();
    write_index(temp.path(), "aapl", &[chunk("a", "apple", unit(0))]);
    write_manifest(temp.path(), "aapl", "text-embedding-3-large", DIM);

    let err = registry(temp.path()).load("aapl").unwrap_err();
    let message = err.to_string();
    assert!(message.contains("Could not load index 'aapl'"));
    assert!(message.contains("text-embedding-3-large"));
}

#[test]
fn test_manifest_dimension_mismatch_fails_load() {
    let temp = TempDir::new().unwrap();
    write_index(temp.path(), "aapl", &[chunk("a", "apple", unit(0))]);
    write_manifest(temp.path(), "aapl", "trigram-v1", 768);

    let err = registry(temp.path()).load("aapl").unwrap_err();
    assert!(err.to_string().contains("768-dimensional"));
}

#[test]
fn test_matching_manifest_loads() {
    let temp = TempDir::new().unwrap();
    write_index(temp.path(), "aapl", &[chunk("a", "apple", unit(0))]);
    write_manifest(temp.path(), "aapl", "trigram-v1", DIM);

    let handle = registry(temp.path()).load("aapl").unwrap();
    assert_eq!(handle.name, "aapl");
}

#[tokio::test]
async fn test_loaded_index_is_searchable() {
    let temp = TempDir::new().unwrap();
    let embedder = Arc::new(MockProvider::new(64));
    let texts = ["net sales grew in services", "headcount was stable"];
    let mut chunks = Vec::new();
    for (i, text) in texts.iter().enumerate() {
        chunks.push(chunk(&format!("c{}", i), text, embedder.embed(text).await.unwrap()));
    }
    write_index(temp.path(), "aapl", &chunks);

    let registry = IndexRegistry::new(temp.path(), embedder);
    let handle = registry.load("aapl").unwrap();
    let hits = handle.store.search("services net sales", 1).await.unwrap();

    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].text, texts[0]);
}
