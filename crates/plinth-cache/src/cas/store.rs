//! CAS store implementation
//!
//! Blobs live under `root/ab/cd/abcd…`, keyed by their blake3 hash.

use camino::{Utf8Path, Utf8PathBuf};
use plinth_core::error::PlinthError;
use std::fs;
use std::sync::atomic::{AtomicU64, Ordering};

use super::hash::compute_hash;
use super::{CacheEntry, CasIndex, ContentHash};
use crate::CacheResult;

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Content-addressable storage
#[derive(Debug)]
pub struct CasStore {
    /// Root directory for storage (`<cache-dir>/objects`)
    root_path: Utf8PathBuf,
    /// Size and access metadata keyed by hash
    index: CasIndex,
}

impl CasStore {
    /// Create a new CAS store
    pub fn new<P: AsRef<Utf8Path>>(root_path: P) -> CacheResult<Self> {
        let root_path = root_path.as_ref().to_path_buf();

        fs::create_dir_all(&root_path)
            .map_err(|e| PlinthError::io("Failed to create store directory".to_string(), e))?;

        let index = CasIndex::load_or_create(root_path.join("index.json"))?;

        Ok(Self { root_path, index })
    }

    fn hash_to_path(&self, hash: &ContentHash) -> Utf8PathBuf {
        let hex = hash.to_hex();
        self.root_path.join(&hex[0..2]).join(&hex[2..4]).join(&hex)
    }

    /// Check if content exists in store
    pub fn contains(&self, hash: &ContentHash) -> bool {
        self.hash_to_path(hash).exists()
    }

    pub fn root_path(&self) -> &Utf8Path {
        &self.root_path
    }

    /// Store content and return its hash
    pub fn store(&self, content: &[u8]) -> CacheResult<ContentHash> {
        let hash = compute_hash(content);
        let path = self.hash_to_path(&hash);
        let key = hash.to_hex();

        if path.exists() {
            if self.index.get(&key).is_none() {
                self.index.insert(key, CacheEntry::new(hash, content.len() as u64));
            }
            return Ok(hash);
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| PlinthError::io("Failed to create content directory".to_string(), e))?;
        }

        // Concurrent writers of the same blob each rename a complete file into place
        let temp = path.with_extension(format!(
            "{}.{}.tmp",
            std::process::id(),
            TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));
        fs::write(&temp, content)
            .map_err(|e| PlinthError::io("Failed to write content file".to_string(), e))?;
        fs::rename(&temp, &path)
            .map_err(|e| PlinthError::io("Failed to move content file into place".to_string(), e))?;

        self.index.insert(key, CacheEntry::new(hash, content.len() as u64));

        Ok(hash)
    }

    /// Get content by hash
    pub fn get(&self, hash: &ContentHash) -> CacheResult<Vec<u8>> {
        let path = self.hash_to_path(hash);

        if !path.exists() {
            return Err(PlinthError::IntegrityFailure {
                package: "cache".to_string(),
                expected: hash.to_hex(),
                actual: "not found".to_string(),
            });
        }

        let content = fs::read(&path)
            .map_err(|e| PlinthError::io("Failed to read content file".to_string(), e))?;

        self.index.get(&hash.to_hex());

        Ok(content)
    }

    /// Delete a blob and its metadata
    pub fn remove(&self, hash: &ContentHash) -> CacheResult<()> {
        let path = self.hash_to_path(hash);
        if path.exists() {
            fs::remove_file(&path)
                .map_err(|e| PlinthError::io("Failed to remove content file".to_string(), e))?;
        }
        self.index.remove(&hash.to_hex());
        Ok(())
    }

    pub fn save_index(&self) -> CacheResult<()> {
        self.index.save()
    }
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;
    use proptest::test_runner::Config as ProptestConfig;
    use tempfile::tempdir;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(10))]
        #[test]
        fn stored_content_round_trips(content in prop::collection::vec(any::<u8>(), 0..1000)) {
            let temp_dir = tempdir().unwrap();
            let store_path = Utf8PathBuf::from_path_buf(temp_dir.path().to_path_buf()).unwrap();
            let store = CasStore::new(&store_path).unwrap();

            let hash = store.store(&content).unwrap();
            prop_assert!(store.contains(&hash));
            prop_assert_eq!(store.get(&hash).unwrap(), content);
        }
    }
}
