//! Repository index caching with TTL support

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use dashmap::DashMap;

use crate::index::RepositoryIndex;
use crate::source::Repository;
use crate::RegistryResult;

/// Default lifetime of a cached index
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// Cache entry with TTL
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Cached index
    pub index: Arc<RepositoryIndex>,
    /// When the entry was stored
    pub stored_at: SystemTime,
    /// Time-to-live duration
    pub ttl: Duration,
}

impl CacheEntry {
    /// Create new cache entry with default TTL
    pub fn new(index: Arc<RepositoryIndex>) -> Self {
        Self::with_ttl(index, DEFAULT_TTL)
    }

    /// Create cache entry with custom TTL
    pub fn with_ttl(index: Arc<RepositoryIndex>, ttl: Duration) -> Self {
        Self {
            index,
            stored_at: SystemTime::now(),
            ttl,
        }
    }

    /// Check if cache entry is still fresh
    pub fn is_fresh(&self) -> bool {
        match self.stored_at.elapsed() {
            Ok(elapsed) => elapsed < self.ttl,
            Err(_) => false,
        }
    }

    /// Get age of cache entry
    pub fn age(&self) -> Option<Duration> {
        self.stored_at.elapsed().ok()
    }
}

/// In-memory index cache keyed by repository location.
///
/// Owned by whoever runs a workflow and passed in explicitly.
#[derive(Debug)]
pub struct IndexCache {
    cache: DashMap<String, CacheEntry>,
    ttl: Duration,
}

impl IndexCache {
    /// Create new index cache with the default TTL
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_TTL)
    }

    /// Create index cache whose entries live for `ttl`
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            cache: DashMap::new(),
            ttl,
        }
    }

    /// Get cached index if fresh
    pub fn get(&self, location: &str) -> Option<Arc<RepositoryIndex>> {
        let fresh = {
            let entry = self.cache.get(location)?;
            entry.is_fresh().then(|| Arc::clone(&entry.index))
        };
        if fresh.is_none() {
            self.cache.remove(location);
        }
        fresh
    }

    /// Store an index
    pub fn insert(&self, index: Arc<RepositoryIndex>) {
        let location = index.location().to_string();
        self.cache.insert(location, CacheEntry::with_ttl(index, self.ttl));
    }

    /// Return the cached index for `repository`, loading it on a miss
    pub async fn load(&self, repository: &dyn Repository) -> RegistryResult<Arc<RepositoryIndex>> {
        if let Some(index) = self.get(repository.location()) {
            tracing::debug!(repository = repository.location(), "index cache hit");
            return Ok(index);
        }
        let index = Arc::new(repository.load_index().await?);
        self.insert(Arc::clone(&index));
        Ok(index)
    }

    /// Check if a location is cached and fresh
    pub fn contains_fresh(&self, location: &str) -> bool {
        self.cache
            .get(location)
            .map(|entry| entry.is_fresh())
            .unwrap_or(false)
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        let fresh_entries = self.cache.iter().filter(|entry| entry.is_fresh()).count();
        CacheStats {
            total_entries: self.cache.len(),
            fresh_entries,
            stale_entries: self.cache.len() - fresh_entries,
        }
    }

    /// Clear all cached entries
    pub fn clear(&self) {
        self.cache.clear();
    }

    /// Remove stale entries
    pub fn cleanup(&self) -> usize {
        let before = self.cache.len();
        self.cache.retain(|_, entry| entry.is_fresh());
        before - self.cache.len()
    }
}

/// Cache statistics
#[derive(Debug, Clone)]
pub struct CacheStats {
    /// Total number of entries
    pub total_entries: usize,
    /// Number of fresh entries
    pub fresh_entries: usize,
    /// Number of stale entries
    pub stale_entries: usize,
}

impl Default for IndexCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests;
