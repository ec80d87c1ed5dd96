//! The installer collaborator
//!
//! The orchestrator never touches the install target directly; it asks a
//! `PackageInstaller` for the installed set and to apply changes.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use plinth_cache::InstallTarget;
use plinth_core::{PackageDefinition, PlinthError};

use crate::InstallerResult;

/// Applies installs and removals to an install target
#[async_trait]
pub trait PackageInstaller: Send + Sync + fmt::Debug {
    /// Currently installed packages keyed by name
    async fn installed(&self) -> InstallerResult<HashMap<String, PackageDefinition>>;

    /// Install `definition` from the archive at `archive`
    async fn install(&self, definition: &PackageDefinition, archive: &Path) -> InstallerResult<()>;

    /// Remove an installed package
    async fn uninstall(&self, definition: &PackageDefinition) -> InstallerResult<()>;

    /// File guarding the target against concurrent changes
    fn lock_path(&self) -> PathBuf;
}

async fn blocking<T, F>(package: String, work: F) -> InstallerResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> InstallerResult<T> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| PlinthError::InstallFailure {
            package,
            message: format!("install task failed: {}", e),
            source: Some(Box::new(e)),
        })?
}

#[async_trait]
impl PackageInstaller for InstallTarget {
    async fn installed(&self) -> InstallerResult<HashMap<String, PackageDefinition>> {
        let target = self.clone();
        blocking(self.root().display().to_string(), move || target.installed()).await
    }

    async fn install(&self, definition: &PackageDefinition, archive: &Path) -> InstallerResult<()> {
        let target = self.clone();
        let definition = definition.clone();
        let archive = archive.to_path_buf();
        blocking(definition.identity.to_string(), move || {
            target.install(&definition, &archive).map(|_| ())
        })
        .await
    }

    async fn uninstall(&self, definition: &PackageDefinition) -> InstallerResult<()> {
        let target = self.clone();
        let definition = definition.clone();
        blocking(definition.identity.to_string(), move || target.uninstall(&definition)).await
    }

    fn lock_path(&self) -> PathBuf {
        InstallTarget::lock_path(self)
    }
}
