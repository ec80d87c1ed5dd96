//! Unit tests for the index cache

use super::*;
use crate::file::FileRepository;
use crate::api::{IndexDocument, INDEX_FILE_NAME};
use plinth_core::PackageDefinition;
use std::time::Duration;

fn create_test_index(location: &str) -> Arc<RepositoryIndex> {
    Arc::new(RepositoryIndex::new(
        location,
        vec![PackageDefinition::parse("Core", "1.0.0").unwrap()],
    ))
}

#[test]
fn test_cache_entry_creation() {
    let entry = CacheEntry::new(create_test_index("repo"));

    assert_eq!(entry.index.location(), "repo");
    assert_eq!(entry.ttl, DEFAULT_TTL);
    assert!(entry.is_fresh());
    assert!(entry.age().unwrap() < Duration::from_secs(5));
}

#[test]
fn test_insert_and_get() {
    let cache = IndexCache::new();
    cache.insert(create_test_index("repo"));

    let retrieved = cache.get("repo").unwrap();
    assert_eq!(retrieved.len(), 1);
    assert!(cache.get("other").is_none());
}

#[test]
fn test_contains_fresh() {
    let cache = IndexCache::new();
    assert!(!cache.contains_fresh("repo"));

    cache.insert(create_test_index("repo"));
    assert!(cache.contains_fresh("repo"));
}

#[test]
fn test_zero_ttl_entries_are_stale() {
    let cache = IndexCache::with_ttl(Duration::ZERO);
    cache.insert(create_test_index("a"));
    cache.insert(create_test_index("b"));

    let stats = cache.stats();
    assert_eq!(stats.total_entries, 2);
    assert_eq!(stats.stale_entries, 2);

    assert!(cache.get("a").is_none());
    assert_eq!(cache.cleanup(), 1);
    assert_eq!(cache.stats().total_entries, 0);
}

#[test]
fn test_clear() {
    let cache = IndexCache::new();
    cache.insert(create_test_index("a"));
    cache.clear();
    assert_eq!(cache.stats().total_entries, 0);
}

#[tokio::test]
async fn test_load_populates_cache() {
    let dir = tempfile::tempdir().unwrap();
    let doc = IndexDocument::new(vec![PackageDefinition::parse("Core", "1.0.0").unwrap()]);
    std::fs::write(
        dir.path().join(INDEX_FILE_NAME),
        serde_json::to_vec(&doc).unwrap(),
    )
    .unwrap();

    let repo = FileRepository::new("local", dir.path());
    let cache = IndexCache::new();
    let first = cache.load(&repo).await.unwrap();
    assert!(cache.contains_fresh("local"));

    // Served from cache even after the index disappears
    std::fs::remove_file(dir.path().join(INDEX_FILE_NAME)).unwrap();
    let second = cache.load(&repo).await.unwrap();
    assert!(Arc::ptr_eq(&first, &second));
}
