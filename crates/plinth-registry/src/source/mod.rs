//! Repository sources
//!
//! A `Repository` loads its index and downloads package archives. The
//! concrete implementation is picked from the location's URL scheme through
//! an explicit table.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use plinth_core::{PackageDefinition, PlinthError};
use url::Url;

use crate::client::{HttpRepository, RetryConfig};
use crate::file::FileRepository;
use crate::index::RepositoryIndex;
use crate::RegistryResult;

/// A package source
#[async_trait]
pub trait Repository: Send + Sync + fmt::Debug {
    /// Location string this repository was opened from
    fn location(&self) -> &str;

    /// Load the full package index
    async fn load_index(&self) -> RegistryResult<RepositoryIndex>;

    /// Download the archive of `definition` to `destination`.
    ///
    /// The declared checksum, if any, is verified before the file is written.
    async fn download_package(
        &self,
        definition: &PackageDefinition,
        destination: &Path,
    ) -> RegistryResult<()>;
}

type Constructor = fn(&str, &RetryConfig) -> RegistryResult<Arc<dyn Repository>>;

/// URL scheme to repository implementation
const SCHEMES: &[(&str, Constructor)] = &[
    ("file", open_file),
    ("http", open_http),
    ("https", open_http),
];

/// Open a repository by location.
///
/// Plain paths (including Windows drive paths) are treated as `file`.
pub fn open_repository(location: &str, retry: &RetryConfig) -> RegistryResult<Arc<dyn Repository>> {
    let scheme = scheme_of(location);
    let constructor = SCHEMES
        .iter()
        .find(|(name, _)| *name == scheme)
        .map(|(_, constructor)| *constructor)
        .ok_or_else(|| PlinthError::ConfigValidation {
            field: "repository".to_string(),
            reason: format!("unsupported repository scheme '{}' in {}", scheme, location),
        })?;
    constructor(location, retry)
}

/// Schemes `open_repository` understands
pub fn supported_schemes() -> impl Iterator<Item = &'static str> {
    SCHEMES.iter().map(|(name, _)| *name)
}

fn scheme_of(location: &str) -> String {
    match Url::parse(location) {
        // Single letters are drive prefixes like C:\repo
        Ok(url) if url.scheme().len() > 1 => url.scheme().to_string(),
        _ => "file".to_string(),
    }
}

fn open_file(location: &str, _retry: &RetryConfig) -> RegistryResult<Arc<dyn Repository>> {
    let root = match Url::parse(location) {
        Ok(url) if url.scheme() == "file" => url.to_file_path().map_err(|_| {
            PlinthError::ConfigValidation {
                field: "repository".to_string(),
                reason: format!("invalid file URL {}", location),
            }
        })?,
        _ => PathBuf::from(location),
    };
    Ok(Arc::new(FileRepository::new(location, root)))
}

fn open_http(location: &str, retry: &RetryConfig) -> RegistryResult<Arc<dyn Repository>> {
    Ok(Arc::new(HttpRepository::new(location, retry.clone())?))
}
