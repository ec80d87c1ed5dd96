//! Package artifact cache
//!
//! Maps `name@version@arch` keys onto archives held in the CAS store.

use camino::{Utf8Path, Utf8PathBuf};
use plinth_core::PackageIdentity;
use tracing::{debug, warn};

use super::hash::compute_hash;
use super::{CacheEntry, CasIndex, CasStore, ContentHash};
use crate::CacheResult;

/// Downloaded package archives keyed by package identity
#[derive(Debug)]
pub struct ArtifactStore {
    root: Utf8PathBuf,
    objects: CasStore,
    packages: CasIndex,
}

impl ArtifactStore {
    /// Open (or create) the artifact cache rooted at `root`
    pub fn open<P: AsRef<Utf8Path>>(root: P) -> CacheResult<Self> {
        let root = root.as_ref().to_path_buf();
        let objects = CasStore::new(root.join("objects"))?;
        let packages = CasIndex::load_or_create(root.join("packages.json"))?;
        Ok(Self {
            root,
            objects,
            packages,
        })
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Whether an archive for `identity` is cached
    pub fn contains(&self, identity: &PackageIdentity) -> bool {
        self.packages
            .get(&identity.cache_key())
            .is_some_and(|entry| self.objects.contains(&entry.hash))
    }

    /// Cached archive bytes for `identity`.
    ///
    /// Entries whose blob is missing or no longer matches its hash are
    /// dropped and reported as a miss.
    pub fn get(&self, identity: &PackageIdentity) -> CacheResult<Option<Vec<u8>>> {
        let key = identity.cache_key();
        let Some(entry) = self.packages.get(&key) else {
            return Ok(None);
        };

        if !self.objects.contains(&entry.hash) {
            debug!(package = %key, "cached artifact missing from store");
            self.packages.remove(&key);
            return Ok(None);
        }

        let content = self.objects.get(&entry.hash)?;
        if compute_hash(&content) != entry.hash {
            warn!(package = %key, "discarding corrupt cached artifact");
            self.objects.remove(&entry.hash)?;
            self.packages.remove(&key);
            return Ok(None);
        }

        debug!(package = %key, "artifact cache hit");
        Ok(Some(content))
    }

    /// Cache the archive for `identity`
    pub fn put(&self, identity: &PackageIdentity, content: &[u8]) -> CacheResult<ContentHash> {
        let hash = self.objects.store(content)?;
        self.packages
            .insert(identity.cache_key(), CacheEntry::new(hash, content.len() as u64));
        Ok(hash)
    }

    /// Forget the cached archive for `identity`
    pub fn evict(&self, identity: &PackageIdentity) -> CacheResult<()> {
        if let Some(entry) = self.packages.remove(&identity.cache_key()) {
            self.objects.remove(&entry.hash)?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    /// Persist both indexes
    pub fn save(&self) -> CacheResult<()> {
        self.objects.save_index()?;
        self.packages.save()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plinth_core::{Architecture, SemanticVersion};
    use std::fs;
    use tempfile::tempdir;

    fn open(dir: &tempfile::TempDir) -> ArtifactStore {
        ArtifactStore::open(Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap()).unwrap()
    }

    fn identity(version: &str) -> PackageIdentity {
        PackageIdentity::new("Viewer", version.parse::<SemanticVersion>().unwrap())
            .with_architecture(Architecture::X64)
    }

    #[test]
    fn test_put_and_get() {
        let dir = tempdir().unwrap();
        let store = open(&dir);

        assert!(store.get(&identity("1.0.0")).unwrap().is_none());
        store.put(&identity("1.0.0"), b"archive").unwrap();

        assert!(store.contains(&identity("1.0.0")));
        assert!(!store.contains(&identity("1.0.1")));
        assert_eq!(store.get(&identity("1.0.0")).unwrap().unwrap(), b"archive");
    }

    #[test]
    fn test_persists_across_open() {
        let dir = tempdir().unwrap();
        {
            let store = open(&dir);
            store.put(&identity("2.0.0"), b"archive").unwrap();
            store.save().unwrap();
        }
        let store = open(&dir);
        assert_eq!(store.len(), 1);
        assert!(store.contains(&identity("2.0.0")));
    }

    #[test]
    fn test_corrupt_blob_is_a_miss() {
        let dir = tempdir().unwrap();
        let store = open(&dir);
        let hash = store.put(&identity("1.0.0"), b"archive").unwrap();

        let hex = hash.to_hex();
        let blob = dir
            .path()
            .join("objects")
            .join(&hex[0..2])
            .join(&hex[2..4])
            .join(&hex);
        fs::write(blob, b"garbage").unwrap();

        assert!(store.get(&identity("1.0.0")).unwrap().is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_evict() {
        let dir = tempdir().unwrap();
        let store = open(&dir);
        store.put(&identity("1.0.0"), b"archive").unwrap();
        store.evict(&identity("1.0.0")).unwrap();
        assert!(!store.contains(&identity("1.0.0")));
    }
}
