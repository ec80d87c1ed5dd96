//! Artifact cache and install targets for Plinth
//!
//! This crate provides a content-addressable store for downloaded package
//! archives, the package archive format itself (a gzipped tar carrying its
//! own manifest), and the on-disk install target with its installed-package
//! database and exclusive lock.

pub mod cas;
pub mod lock;
pub mod tarball;
pub mod target;

// Re-export main types
pub use cas::{ArtifactStore, CacheEntry, CasIndex, CasStore, ContentHash};
pub use lock::InstallLock;
pub use tarball::{
    create_package_archive, extract_package, package_archive_bytes, read_package_manifest,
    MANIFEST_FILE_NAME,
};
pub use target::InstallTarget;

use plinth_core::error::PlinthError;

/// Result type for cache operations
pub type CacheResult<T> = Result<T, PlinthError>;
