//! Local directory repositories

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use plinth_core::utils::{safe_join, verify_integrity};
use plinth_core::{PackageDefinition, PlinthError};

use crate::api::INDEX_FILE_NAME;
use crate::index::RepositoryIndex;
use crate::source::Repository;
use crate::RegistryResult;

/// Repository stored in a local directory
#[derive(Debug, Clone)]
pub struct FileRepository {
    location: String,
    root: PathBuf,
}

impl FileRepository {
    pub fn new(location: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            location: location.into(),
            root: root.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn artifact_path(&self, definition: &PackageDefinition) -> RegistryResult<PathBuf> {
        let artifact = definition.artifact.as_deref().ok_or_else(|| {
            PlinthError::DownloadFailure {
                package: definition.identity.to_string(),
                message: "no artifact listed in the repository index".to_string(),
                source: None,
            }
        })?;
        let artifact = Path::new(artifact);
        if artifact.is_absolute() {
            Ok(artifact.to_path_buf())
        } else {
            safe_join(&self.root, artifact)
        }
    }
}

#[async_trait]
impl Repository for FileRepository {
    fn location(&self) -> &str {
        &self.location
    }

    async fn load_index(&self) -> RegistryResult<RepositoryIndex> {
        let path = self.root.join(INDEX_FILE_NAME);
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| PlinthError::io(format!("Failed to read {}", path.display()), e))?;
        let index = RepositoryIndex::from_json(self.location.clone(), &bytes)?;
        tracing::debug!(repository = %self.location, packages = index.len(), "loaded index");
        Ok(index)
    }

    async fn download_package(
        &self,
        definition: &PackageDefinition,
        destination: &Path,
    ) -> RegistryResult<()> {
        let source = self.artifact_path(definition)?;
        let bytes = tokio::fs::read(&source)
            .await
            .map_err(|e| PlinthError::io(format!("Failed to read {}", source.display()), e))?;

        if let Some(expected) = &definition.checksum {
            verify_integrity(&definition.identity.to_string(), &bytes, expected)?;
        }

        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| PlinthError::io(format!("Failed to create {}", parent.display()), e))?;
        }
        tokio::fs::write(destination, &bytes)
            .await
            .map_err(|e| PlinthError::io(format!("Failed to write {}", destination.display()), e))?;
        Ok(())
    }
}
