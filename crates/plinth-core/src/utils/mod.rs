//! Utility functions and helpers.
//!
//! Common functionality used across multiple Plinth crates.

pub mod hash;
pub mod path;

// Re-export commonly used utilities
pub use hash::{blake3_hash, verify_integrity};
pub use path::{file_key, is_safe_path, normalize_path, safe_join};
