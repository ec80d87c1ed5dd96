//! Blake3 checksums of package archives.

use crate::error::{PlinthError, PlinthResult};

/// Lowercase hex Blake3 digest of `data`
pub fn blake3_hash(data: &[u8]) -> String {
    blake3::hash(data).to_hex().to_string()
}

/// Check downloaded bytes of `package` against the checksum its definition
/// declares. Comparison ignores hex case.
pub fn verify_integrity(package: &str, data: &[u8], expected_hash: &str) -> PlinthResult<()> {
    let actual_hash = blake3_hash(data);
    if actual_hash.eq_ignore_ascii_case(expected_hash.trim()) {
        Ok(())
    } else {
        Err(PlinthError::IntegrityFailure {
            package: package.to_string(),
            expected: expected_hash.to_string(),
            actual: actual_hash,
        })
    }
}
