//! Package repositories for Plinth
//!
//! This crate loads repository indexes and downloads package archives from
//! local directories and HTTP servers, with connection pooling, retry logic
//! and an explicit TTL cache for loaded indexes.

pub mod api;
pub mod cache;
pub mod client;
pub mod file;
pub mod index;
pub mod source;

// Re-export main types
pub use api::{IndexDocument, INDEX_FILE_NAME};
pub use cache::{CacheEntry, CacheStats, IndexCache};
pub use client::{HttpRepository, RetryConfig};
pub use file::FileRepository;
pub use index::{keeps_consistent, RepositoryIndex};
pub use source::{open_repository, supported_schemes, Repository};

use plinth_core::error::PlinthError;

/// Result type for registry operations
pub type RegistryResult<T> = Result<T, PlinthError>;
