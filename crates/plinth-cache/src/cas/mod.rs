//! Content-addressable storage for package archives
//!
//! Archives are stored once by blake3 hash; the artifact store maps package
//! identities onto those hashes so a repeated install skips the download.

pub mod artifact;
pub mod hash;
pub mod index;
pub mod store;

// Re-export main types
pub use artifact::ArtifactStore;
pub use hash::ContentHash;
pub use index::{CacheEntry, CasIndex};
pub use store::CasStore;
