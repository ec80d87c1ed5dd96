//! Concurrent artifact download
//!
//! Every package in a batch is fetched concurrently and the whole set is
//! joined before the caller moves on; one failure fails the batch. Archives
//! already in the artifact cache are copied out instead of downloaded.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::future::join_all;
use plinth_cache::ArtifactStore;
use plinth_core::utils::verify_integrity;
use plinth_core::{PackageDefinition, PackageIdentity, PlinthError};
use plinth_registry::{IndexCache, Repository};
use tracing::{debug, warn};

use crate::InstallerResult;

/// Caches scoped to one orchestrator instance
#[derive(Debug, Clone, Default)]
pub struct CacheHandle {
    /// Downloaded archives, when artifact caching is enabled
    pub artifacts: Option<Arc<ArtifactStore>>,
    /// Loaded repository indexes
    pub indexes: Arc<IndexCache>,
}

impl CacheHandle {
    pub fn new(artifacts: Option<Arc<ArtifactStore>>, indexes: Arc<IndexCache>) -> Self {
        Self { artifacts, indexes }
    }

    /// Persist whatever the artifact cache learned
    pub fn flush(&self) {
        if let Some(artifacts) = &self.artifacts {
            if let Err(e) = artifacts.save() {
                warn!(error = %e, "failed to save artifact cache index");
            }
        }
    }
}

/// One archive on disk, ready to install
#[derive(Debug, Clone)]
pub struct FetchedArtifact {
    pub identity: PackageIdentity,
    pub path: PathBuf,
    /// Served from the artifact cache
    pub cached: bool,
}

/// File name an archive is staged under
pub fn archive_file_name(identity: &PackageIdentity) -> String {
    let name: String = identity
        .name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' { c } else { '_' })
        .collect();
    format!("{}-{}-{}.tar.gz", name, identity.version, identity.architecture)
}

/// Fetch every definition into `destination`, concurrently
pub async fn download_all(
    batch: &[PackageDefinition],
    repositories: &[Arc<dyn Repository>],
    cache: &CacheHandle,
    destination: &Path,
) -> InstallerResult<Vec<FetchedArtifact>> {
    let results = join_all(
        batch
            .iter()
            .map(|definition| fetch_one(definition, repositories, cache, destination)),
    )
    .await;

    let mut fetched = Vec::with_capacity(results.len());
    for result in results {
        fetched.push(result?);
    }
    Ok(fetched)
}

async fn fetch_one(
    definition: &PackageDefinition,
    repositories: &[Arc<dyn Repository>],
    cache: &CacheHandle,
    destination: &Path,
) -> InstallerResult<FetchedArtifact> {
    let identity = definition.identity.clone();
    let path = destination.join(archive_file_name(&identity));

    if let Some(artifacts) = &cache.artifacts {
        if let Some(bytes) = artifacts.get(&identity)? {
            write_archive(&identity, &path, &bytes).await?;
            return Ok(FetchedArtifact {
                identity,
                path,
                cached: true,
            });
        }
    }

    download_to(definition, repositories, &path)
        .await
        .map_err(|e| match e {
            PlinthError::DownloadFailure { .. } => e,
            other => PlinthError::download(identity.to_string(), other),
        })?;
    debug!(package = %identity, path = %path.display(), "downloaded");

    if let Some(artifacts) = &cache.artifacts {
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| PlinthError::io(format!("Failed to read {}", path.display()), e))?;
        if let Err(e) = artifacts.put(&identity, &bytes) {
            warn!(package = %identity, error = %e, "failed to cache artifact");
        }
    }

    Ok(FetchedArtifact {
        identity,
        path,
        cached: false,
    })
}

/// Download from the repository the definition came from.
///
/// Definitions without a known source but with an absolute artifact path
/// (local archives) are copied directly.
async fn download_to(
    definition: &PackageDefinition,
    repositories: &[Arc<dyn Repository>],
    path: &Path,
) -> InstallerResult<()> {
    let source = definition.source.as_deref();
    if let Some(repository) = repositories
        .iter()
        .find(|repository| Some(repository.location()) == source)
    {
        return repository.download_package(definition, path).await;
    }

    match definition.artifact.as_deref().map(Path::new) {
        Some(local) if local.is_absolute() => {
            let bytes = tokio::fs::read(local)
                .await
                .map_err(|e| PlinthError::io(format!("Failed to read {}", local.display()), e))?;
            if let Some(expected) = &definition.checksum {
                verify_integrity(&definition.identity.to_string(), &bytes, expected)?;
            }
            write_archive(&definition.identity, path, &bytes).await
        },
        _ => Err(PlinthError::DownloadFailure {
            package: definition.identity.to_string(),
            message: match source {
                Some(source) => format!("repository {} is not configured", source),
                None => "no repository provides this package".to_string(),
            },
            source: None,
        }),
    }
}

async fn write_archive(identity: &PackageIdentity, path: &Path, bytes: &[u8]) -> InstallerResult<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| PlinthError::io(format!("Failed to create {}", parent.display()), e))?;
    }
    tokio::fs::write(path, bytes).await.map_err(|e| {
        PlinthError::download(
            identity.to_string(),
            PlinthError::io(format!("Failed to write {}", path.display()), e),
        )
    })
}
