//! CAS index for metadata management
//!
//! Maps string keys onto stored hashes and persists the mapping as JSON
//! next to the store.

use chrono::Utc;
use dashmap::DashMap;
use plinth_core::error::PlinthError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use super::ContentHash;
use crate::CacheResult;

/// Metadata for a cached entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Content hash
    pub hash: ContentHash,
    /// Size in bytes
    pub size: u64,
    /// When the entry was stored (as timestamp)
    pub stored_at: i64,
    /// When the entry was last accessed (as timestamp)
    pub last_accessed: i64,
}

impl CacheEntry {
    pub fn new(hash: ContentHash, size: u64) -> Self {
        let now = Utc::now().timestamp();
        Self {
            hash,
            size,
            stored_at: now,
            last_accessed: now,
        }
    }

    /// Update last accessed time
    pub fn touch(&mut self) {
        self.last_accessed = Utc::now().timestamp();
    }
}

/// Index for managing CAS entries
#[derive(Debug)]
pub struct CasIndex {
    entries: DashMap<String, CacheEntry>,
    index_path: PathBuf,
}

impl CasIndex {
    /// Load existing index or create new one.
    ///
    /// An unreadable or corrupt index starts empty; the store contents are
    /// still there and get re-registered on the next write.
    pub fn load_or_create<P: AsRef<Path>>(index_path: P) -> CacheResult<Self> {
        let index_path = index_path.as_ref().to_path_buf();
        let entries = DashMap::new();

        if index_path.exists() {
            let loaded = fs::read_to_string(&index_path)
                .ok()
                .and_then(|content| serde_json::from_str::<Vec<(String, CacheEntry)>>(&content).ok());
            match loaded {
                Some(loaded) => {
                    for (key, entry) in loaded {
                        entries.insert(key, entry);
                    }
                },
                None => warn!(path = %index_path.display(), "ignoring unreadable cache index"),
            }
        }

        Ok(Self {
            entries,
            index_path,
        })
    }

    pub fn insert(&self, key: String, entry: CacheEntry) {
        self.entries.insert(key, entry);
    }

    /// Get an entry by key, refreshing its access time
    pub fn get(&self, key: &str) -> Option<CacheEntry> {
        let mut entry = self.entries.get_mut(key)?;
        entry.touch();
        Some(entry.clone())
    }

    /// Check for a key without touching it
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn remove(&self, key: &str) -> Option<CacheEntry> {
        self.entries.remove(key).map(|(_, entry)| entry)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Save index to disk
    pub fn save(&self) -> CacheResult<()> {
        let mut entries: Vec<(String, CacheEntry)> = self
            .entries
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));

        let content = serde_json::to_string_pretty(&entries).map_err(|e| {
            PlinthError::io(
                format!("Failed to serialize index: {}", e),
                std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()),
            )
        })?;

        if let Some(parent) = self.index_path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| PlinthError::io("Failed to create index directory".to_string(), e))?;
        }

        fs::write(&self.index_path, content)
            .map_err(|e| PlinthError::io("Failed to write index file".to_string(), e))?;

        Ok(())
    }
}
