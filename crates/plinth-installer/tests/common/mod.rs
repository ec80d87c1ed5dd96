//! Shared fixtures for orchestrator integration tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use plinth_cache::InstallLock;
use plinth_core::{PackageDefinition, PlinthError, VersionSpecifier};
use plinth_installer::{
    DecisionPrompt, InstallationOrchestrator, InstallerResult, OverwriteDecision, PackageInstaller,
};
use plinth_registry::{RegistryResult, Repository, RepositoryIndex};
use plinth_resolver::FileConflict;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

pub fn def(name: &str, version: &str) -> PackageDefinition {
    PackageDefinition::parse(name, version).unwrap()
}

pub fn spec(text: &str) -> VersionSpecifier {
    VersionSpecifier::parse(text).unwrap()
}

/// Repository served from memory that counts downloads
#[derive(Debug)]
pub struct MemoryRepository {
    location: String,
    packages: Vec<PackageDefinition>,
    downloads: AtomicUsize,
    fail_downloads: bool,
    delay: Option<Duration>,
}

impl MemoryRepository {
    pub fn new(location: &str, packages: Vec<PackageDefinition>) -> Arc<Self> {
        Arc::new(Self::build(location, packages))
    }

    pub fn failing(location: &str, packages: Vec<PackageDefinition>) -> Arc<Self> {
        Arc::new(Self {
            fail_downloads: true,
            ..Self::build(location, packages)
        })
    }

    pub fn slow(location: &str, packages: Vec<PackageDefinition>, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay: Some(delay),
            ..Self::build(location, packages)
        })
    }

    fn build(location: &str, packages: Vec<PackageDefinition>) -> Self {
        Self {
            location: location.to_string(),
            packages,
            downloads: AtomicUsize::new(0),
            fail_downloads: false,
            delay: None,
        }
    }

    pub fn downloads(&self) -> usize {
        self.downloads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    fn location(&self) -> &str {
        &self.location
    }

    async fn load_index(&self) -> RegistryResult<RepositoryIndex> {
        Ok(RepositoryIndex::new(self.location.clone(), self.packages.clone()))
    }

    async fn download_package(&self, definition: &PackageDefinition, destination: &Path) -> RegistryResult<()> {
        self.downloads.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_downloads {
            return Err(PlinthError::Network {
                message: format!("connection reset while fetching {}", definition.identity),
                source: None,
            });
        }
        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent).await.unwrap();
        }
        tokio::fs::write(destination, definition.identity.to_string())
            .await
            .unwrap();
        Ok(())
    }
}

/// Installer that keeps its database in memory and records every call
#[derive(Debug)]
pub struct RecordingInstaller {
    packages: Mutex<HashMap<String, PackageDefinition>>,
    events: Mutex<Vec<String>>,
    lock_dir: TempDir,
    fail_on: Option<String>,
    /// Whether the install lock was held by someone else during each install
    lock_held: Mutex<Vec<bool>>,
    /// Cancelled once the next install finishes
    cancel_after_install: Mutex<Option<CancellationToken>>,
}

impl RecordingInstaller {
    pub fn new(installed: Vec<PackageDefinition>) -> Arc<Self> {
        Arc::new(Self::build(installed, None))
    }

    pub fn failing_on(installed: Vec<PackageDefinition>, name: &str) -> Arc<Self> {
        Arc::new(Self::build(installed, Some(name.to_string())))
    }

    fn build(installed: Vec<PackageDefinition>, fail_on: Option<String>) -> Self {
        Self {
            packages: Mutex::new(
                installed
                    .into_iter()
                    .map(|def| (def.name().to_string(), def))
                    .collect(),
            ),
            events: Mutex::new(Vec::new()),
            lock_dir: tempfile::tempdir().unwrap(),
            fail_on,
            lock_held: Mutex::new(Vec::new()),
            cancel_after_install: Mutex::new(None),
        }
    }

    /// Cancel `token` from inside the next install call
    pub fn cancel_after_install(&self, token: CancellationToken) {
        *self.cancel_after_install.lock().unwrap() = Some(token);
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    pub fn lock_held(&self) -> Vec<bool> {
        self.lock_held.lock().unwrap().clone()
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.packages.lock().unwrap().keys().cloned().collect();
        names.sort();
        names
    }
}

#[async_trait]
impl PackageInstaller for RecordingInstaller {
    async fn installed(&self) -> InstallerResult<HashMap<String, PackageDefinition>> {
        Ok(self.packages.lock().unwrap().clone())
    }

    async fn install(&self, definition: &PackageDefinition, archive: &Path) -> InstallerResult<()> {
        assert!(archive.exists(), "archive for {} was not staged", definition.identity);
        let contended = InstallLock::try_acquire(self.lock_path()).unwrap().is_none();
        self.lock_held.lock().unwrap().push(contended);

        if self.fail_on.as_deref() == Some(definition.name()) {
            return Err(PlinthError::io(
                format!("disk full while installing {}", definition.identity),
                std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
            ));
        }
        self.events
            .lock()
            .unwrap()
            .push(format!("install {}", definition.identity));
        self.packages
            .lock()
            .unwrap()
            .insert(definition.name().to_string(), definition.clone());
        if let Some(token) = self.cancel_after_install.lock().unwrap().take() {
            token.cancel();
        }
        Ok(())
    }

    async fn uninstall(&self, definition: &PackageDefinition) -> InstallerResult<()> {
        self.events
            .lock()
            .unwrap()
            .push(format!("uninstall {}", definition.identity));
        self.packages.lock().unwrap().remove(definition.name());
        Ok(())
    }

    fn lock_path(&self) -> PathBuf {
        self.lock_dir.path().join("install.lock")
    }
}

/// Prompt with fixed answers that records what it was asked
#[derive(Debug)]
pub struct ScriptedPrompt {
    pub include: bool,
    pub overwrite: OverwriteDecision,
    pub asked: Mutex<Vec<String>>,
}

impl ScriptedPrompt {
    pub fn new(include: bool, overwrite: OverwriteDecision) -> Arc<Self> {
        Arc::new(Self {
            include,
            overwrite,
            asked: Mutex::new(Vec::new()),
        })
    }

    pub fn asked(&self) -> Vec<String> {
        self.asked.lock().unwrap().clone()
    }
}

impl DecisionPrompt for ScriptedPrompt {
    fn include_dependency(&self, dependency: &PackageDefinition) -> bool {
        self.asked
            .lock()
            .unwrap()
            .push(format!("include {}", dependency.identity));
        self.include
    }

    fn resolve_overwrite(&self, conflicts: &[FileConflict]) -> OverwriteDecision {
        self.asked
            .lock()
            .unwrap()
            .push(format!("overwrite {}", conflicts.len()));
        self.overwrite
    }
}

/// Orchestrator over the given repositories and installer
pub fn orchestrator(
    repositories: &[Arc<MemoryRepository>],
    installer: &Arc<RecordingInstaller>,
) -> InstallationOrchestrator {
    let repositories: Vec<Arc<dyn Repository>> = repositories
        .iter()
        .map(|repository| Arc::clone(repository) as Arc<dyn Repository>)
        .collect();
    InstallationOrchestrator::new(repositories, Arc::clone(installer) as Arc<dyn PackageInstaller>)
}
