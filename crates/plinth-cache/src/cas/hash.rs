//! Content hashing utilities using Blake3
//!
//! This module provides the ContentHash type used as the address of every
//! stored archive.

use blake3::Hasher;
use plinth_core::error::PlinthError;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::CacheResult;

/// A Blake3 content hash for content-addressable storage
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContentHash {
    bytes: [u8; 32],
}

impl ContentHash {
    /// Create a new ContentHash from raw bytes
    pub fn new(bytes: [u8; 32]) -> Self {
        Self { bytes }
    }

    /// Create a new ContentHash from a byte slice of length 32
    pub fn from_slice(bytes: &[u8]) -> CacheResult<Self> {
        let array: [u8; 32] = bytes.try_into().map_err(|_| PlinthError::IntegrityFailure {
            package: "hash".to_string(),
            expected: "32 bytes".to_string(),
            actual: format!("{} bytes", bytes.len()),
        })?;
        Ok(Self { bytes: array })
    }

    /// Convert hash to hexadecimal string
    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }

    /// Create ContentHash from hexadecimal string
    pub fn from_hex(hex_str: &str) -> CacheResult<Self> {
        let bytes = hex::decode(hex_str).map_err(|e| PlinthError::IntegrityFailure {
            package: "hash".to_string(),
            expected: "valid hex string".to_string(),
            actual: format!("invalid hex: {}", e),
        })?;
        Self::from_slice(&bytes)
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl TryFrom<String> for ContentHash {
    type Error = PlinthError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_hex(&value)
    }
}

impl From<ContentHash> for String {
    fn from(hash: ContentHash) -> Self {
        hash.to_hex()
    }
}

/// Compute Blake3 hash of content
pub fn compute_hash(content: &[u8]) -> ContentHash {
    let mut hasher = Hasher::new();
    hasher.update(content);
    ContentHash::new(*hasher.finalize().as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_length() {
        assert!(ContentHash::from_slice(&[0u8; 16]).is_err());
        assert!(ContentHash::from_hex("abcd").is_err());
        assert!(ContentHash::from_hex("not hex").is_err());
    }

    #[test]
    fn test_hex_conversion() {
        let hash = ContentHash::new([7u8; 32]);
        let restored = ContentHash::from_hex(&hash.to_hex()).unwrap();
        assert_eq!(hash, restored);
    }

    #[test]
    fn test_matches_core_digest() {
        let content = b"hello world";
        assert_eq!(
            compute_hash(content).to_hex(),
            plinth_core::utils::blake3_hash(content)
        );
        assert_ne!(compute_hash(content), compute_hash(b"hello world!"));
    }

    #[test]
    fn test_serde_as_hex_string() {
        let hash = compute_hash(b"payload");
        let json = serde_json::to_string(&hash).unwrap();
        assert_eq!(json, format!("\"{}\"", hash.to_hex()));
        let back: ContentHash = serde_json::from_str(&json).unwrap();
        assert_eq!(back, hash);
    }
}
