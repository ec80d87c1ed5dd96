//! The installation state machine
//!
//! `GatherSpecifiers → ResolvePackages → CheckOverwriteConflicts →
//! CheckDependencyConsistency → [check-only stop] → Download →
//! UninstallSuperseded → OrderAndInstall → Done`
//!
//! Checks abort before anything is downloaded unless `force` turns them
//! into warnings. The install lock is held from the first download until
//! the last install. Cancellation is honored between phases and between
//! package installs; an install already running finishes first. Failed
//! installs are not rolled back.

use std::collections::HashMap;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use plinth_cache::InstallLock;
use plinth_core::{MissingDependencyPolicy, PackageDefinition, PlinthError};
use plinth_registry::{Repository, RepositoryIndex};
use plinth_resolver::{
    describe_broken, find_broken_dependencies, group_by_offender, ConflictDetector,
    DependencyResolver, InstallOrderer, ResolutionResult,
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::collaborator::PackageInstaller;
use crate::download::{download_all, CacheHandle, FetchedArtifact};
use crate::gather::{drop_installed, gather_roots, PackageRequest};
use crate::options::InstallOptions;
use crate::prompt::{DecisionPrompt, NonInteractive, OverwriteDecision};
use crate::report::{InstallOutcome, InstallReport, Phase};
use crate::uninstall::UninstallPlan;
use crate::InstallerResult;

/// Coordinates one install, fetch or uninstall workflow at a time
pub struct InstallationOrchestrator {
    repositories: Vec<Arc<dyn Repository>>,
    installer: Arc<dyn PackageInstaller>,
    prompt: Arc<dyn DecisionPrompt>,
    cache: CacheHandle,
    options: InstallOptions,
    cancel: CancellationToken,
}

/// Result of the planning phases shared by install and fetch
struct Plan {
    report: InstallReport,
    batch: Vec<PackageDefinition>,
}

impl InstallationOrchestrator {
    /// Create an orchestrator over a priority-ordered repository list
    pub fn new(repositories: Vec<Arc<dyn Repository>>, installer: Arc<dyn PackageInstaller>) -> Self {
        Self {
            repositories,
            installer,
            prompt: Arc::new(NonInteractive),
            cache: CacheHandle::default(),
            options: InstallOptions::default(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_prompt(mut self, prompt: Arc<dyn DecisionPrompt>) -> Self {
        self.prompt = prompt;
        self
    }

    pub fn with_cache(mut self, cache: CacheHandle) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_options(mut self, options: InstallOptions) -> Self {
        self.options = options;
        self
    }

    /// Share a cancellation token with the caller
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn options(&self) -> &InstallOptions {
        &self.options
    }

    /// Install the requested packages and whatever they need
    pub async fn install(&self, requests: Vec<PackageRequest>) -> InstallerResult<InstallReport> {
        let result = self.with_deadline(self.run_install(requests)).await;
        self.finish(result)
    }

    /// Resolve the requested packages and download them into `destination`
    /// without installing anything
    pub async fn fetch(&self, requests: Vec<PackageRequest>, destination: &Path) -> InstallerResult<InstallReport> {
        let result = self.with_deadline(self.run_fetch(requests, destination)).await;
        self.finish(result)
    }

    /// Remove installed packages by name
    pub async fn uninstall(&self, names: Vec<String>) -> InstallerResult<InstallReport> {
        let result = self.with_deadline(self.run_uninstall(names)).await;
        self.finish(result)
    }

    async fn with_deadline<T, F>(&self, work: F) -> InstallerResult<T>
    where
        F: Future<Output = InstallerResult<T>>,
    {
        match self.options.timeout {
            Some(limit) => tokio::time::timeout(limit, work)
                .await
                .map_err(|_| PlinthError::Timeout {
                    seconds: limit.as_secs(),
                })?,
            None => work.await,
        }
    }

    fn finish(&self, result: InstallerResult<InstallReport>) -> InstallerResult<InstallReport> {
        self.cache.flush();
        match result {
            Ok(mut report) => {
                report.enter(Phase::Done);
                Ok(report)
            },
            Err(e) => {
                error!(phase = %Phase::Failed, error = %e, "workflow failed");
                Err(e)
            },
        }
    }

    fn checkpoint(&self) -> InstallerResult<()> {
        if self.cancel.is_cancelled() {
            info!("cancellation requested");
            return Err(PlinthError::Cancelled);
        }
        Ok(())
    }

    async fn load_indexes(&self) -> InstallerResult<Vec<Arc<RepositoryIndex>>> {
        let mut indexes = Vec::with_capacity(self.repositories.len());
        for repository in &self.repositories {
            indexes.push(self.cache.indexes.load(repository.as_ref()).await?);
        }
        Ok(indexes)
    }

    async fn run_install(&self, requests: Vec<PackageRequest>) -> InstallerResult<InstallReport> {
        let installed = self.installer.installed().await?;
        let Some(Plan { mut report, batch }) = self.plan(requests, &installed, true).await? else {
            return Ok(InstallReport::default());
        };

        if self.options.check_only {
            report.outcome = InstallOutcome::CheckOnly;
            return Ok(report);
        }

        self.checkpoint()?;
        report.enter(Phase::Download);
        let lock = self.acquire_lock().await?;
        let staging = tempfile::Builder::new()
            .prefix("plinth-staging-")
            .tempdir()
            .map_err(|e| PlinthError::io("Failed to create staging directory".to_string(), e))?;
        let fetched = download_all(&batch, &self.repositories, &self.cache, staging.path()).await?;
        record_fetched(&mut report, &fetched);
        let archives: HashMap<String, FetchedArtifact> = fetched
            .into_iter()
            .map(|artifact| (artifact.identity.cache_key(), artifact))
            .collect();

        self.checkpoint()?;
        report.enter(Phase::UninstallSuperseded);
        for definition in &batch {
            if let Some(current) = installed.get(definition.name()) {
                self.installer
                    .uninstall(current)
                    .await
                    .map_err(|e| as_install_failure(&current.identity.to_string(), e))?;
                info!(package = %current.identity, replacement = %definition.identity, "uninstalled superseded package");
                report.uninstalled.push(current.identity.clone());
            }
        }

        report.enter(Phase::OrderAndInstall);
        for definition in InstallOrderer::new(batch).order() {
            self.checkpoint()?;
            let archive = archives.get(&definition.identity.cache_key()).ok_or_else(|| {
                PlinthError::InstallFailure {
                    package: definition.identity.to_string(),
                    message: "no archive was downloaded".to_string(),
                    source: None,
                }
            })?;
            self.installer
                .install(&definition, &archive.path)
                .await
                .map_err(|e| as_install_failure(&definition.identity.to_string(), e))?;
            report.installed.push(definition.identity.clone());
        }

        drop(lock);
        report.outcome = InstallOutcome::Completed;
        Ok(report)
    }

    async fn run_fetch(&self, requests: Vec<PackageRequest>, destination: &Path) -> InstallerResult<InstallReport> {
        // A fetch ignores what is installed; everything resolved is downloaded
        let installed = HashMap::new();
        let Some(Plan { mut report, batch }) = self.plan(requests, &installed, false).await? else {
            return Ok(InstallReport::default());
        };

        if self.options.check_only {
            report.outcome = InstallOutcome::CheckOnly;
            return Ok(report);
        }

        self.checkpoint()?;
        report.enter(Phase::Download);
        let fetched = download_all(&batch, &self.repositories, &self.cache, destination).await?;
        record_fetched(&mut report, &fetched);
        report.artifacts = fetched.into_iter().map(|artifact| artifact.path).collect();
        report.outcome = InstallOutcome::Completed;
        Ok(report)
    }

    async fn run_uninstall(&self, names: Vec<String>) -> InstallerResult<InstallReport> {
        let mut report = InstallReport::default();
        if names.is_empty() {
            return Ok(report);
        }

        let installed = self.installer.installed().await?;
        let plan = UninstallPlan::new(&installed, &names)?;

        report.enter(Phase::CheckDependencyConsistency);
        if let Err(e) = plan.check() {
            if !self.options.force {
                return Err(e);
            }
            report.broken = plan.broken().to_vec();
            report.warn_forced(format!("removing anyway: {}", describe_broken(plan.broken())));
        }

        if self.options.check_only {
            report.outcome = InstallOutcome::CheckOnly;
            return Ok(report);
        }

        self.checkpoint()?;
        let lock = self.acquire_lock().await?;
        report.enter(Phase::UninstallSuperseded);
        for definition in plan.removal_order() {
            self.checkpoint()?;
            self.installer
                .uninstall(&definition)
                .await
                .map_err(|e| as_install_failure(&definition.identity.to_string(), e))?;
            report.uninstalled.push(definition.identity.clone());
        }
        drop(lock);

        report.outcome = InstallOutcome::Completed;
        Ok(report)
    }

    /// Gather, resolve and run the pre-download checks.
    ///
    /// Returns `None` when every request is already satisfied.
    async fn plan(
        &self,
        requests: Vec<PackageRequest>,
        installed: &HashMap<String, PackageDefinition>,
        check_installed: bool,
    ) -> InstallerResult<Option<Plan>> {
        let mut report = InstallReport::default();

        self.checkpoint()?;
        report.enter(Phase::GatherSpecifiers);
        let indexes = self.load_indexes().await?;
        let index_refs: Vec<&RepositoryIndex> = indexes.iter().map(|index| index.as_ref()).collect();
        let mut roots = gather_roots(&requests, &index_refs, &self.options)?;
        if check_installed && !self.options.force {
            roots = drop_installed(roots, installed);
        }
        if roots.is_empty() {
            info!("nothing to do");
            return Ok(None);
        }
        report.requested = roots.iter().map(|root| root.identity.clone()).collect();

        self.checkpoint()?;
        report.enter(Phase::ResolvePackages);
        let resolution = DependencyResolver::new(installed, roots.clone(), index_refs.iter().copied()).resolve();
        if !resolution.is_complete() {
            let unknown = resolution.describe_unknown();
            if !self.options.force {
                return Err(PlinthError::UnresolvedDependencies { dependencies: unknown });
            }
            report.warn_forced(format!("installing with unresolved dependencies: {}", unknown));
        }
        let batch = self.select_batch(&roots, &resolution);
        report.resolution = resolution;

        if check_installed {
            self.checkpoint()?;
            report.enter(Phase::CheckOverwriteConflicts);
            self.check_overwrites(installed, &batch, &mut report)?;

            self.checkpoint()?;
            report.enter(Phase::CheckDependencyConsistency);
            self.check_consistency(installed, &batch, &mut report)?;
        }

        Ok(Some(Plan { report, batch }))
    }

    /// Roots plus the missing dependencies the policy lets in
    fn select_batch(&self, roots: &[PackageDefinition], resolution: &ResolutionResult) -> Vec<PackageDefinition> {
        let mut batch: Vec<PackageDefinition> = roots.to_vec();
        for missing in &resolution.missing_dependencies {
            if batch.iter().any(|def| def.name() == missing.name()) {
                continue;
            }
            let include = match self.options.missing_dependencies {
                MissingDependencyPolicy::Include => true,
                MissingDependencyPolicy::Skip => false,
                MissingDependencyPolicy::Ask => self.prompt.include_dependency(missing),
            };
            if include {
                batch.push(missing.clone());
            } else {
                warn!(package = %missing.identity, "skipping missing dependency");
            }
        }
        batch
    }

    fn check_overwrites(
        &self,
        installed: &HashMap<String, PackageDefinition>,
        batch: &[PackageDefinition],
        report: &mut InstallReport,
    ) -> InstallerResult<()> {
        let conflicts = ConflictDetector::new(installed.values(), batch).detect();
        if conflicts.is_empty() {
            return Ok(());
        }

        if self.options.force {
            for (offender, files) in group_by_offender(&conflicts) {
                report.warn_forced(format!(
                    "{} overwrites {} file(s) owned by other packages",
                    offender,
                    files.len()
                ));
            }
        } else if self.options.interactive {
            match self.prompt.resolve_overwrite(&conflicts) {
                OverwriteDecision::Cancel => return Err(PlinthError::Cancelled),
                OverwriteDecision::OverwriteAnyway => {
                    warn!(conflicts = conflicts.len(), "overwriting files at user request");
                    report.warnings.push(format!("overwrote {} file(s) at user request", conflicts.len()));
                },
            }
        } else {
            let offenders: Vec<String> = group_by_offender(&conflicts)
                .keys()
                .map(ToString::to_string)
                .collect();
            return Err(PlinthError::FileOverwriteConflict {
                package: offenders.join(", "),
                count: conflicts.len(),
                files: conflicts
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", "),
            });
        }

        report.conflicts = conflicts;
        Ok(())
    }

    fn check_consistency(
        &self,
        installed: &HashMap<String, PackageDefinition>,
        batch: &[PackageDefinition],
        report: &mut InstallReport,
    ) -> InstallerResult<()> {
        let broken = find_broken_dependencies(installed, batch, &[]);
        if broken.is_empty() {
            return Ok(());
        }

        let details = describe_broken(&broken);
        if !self.options.force {
            return Err(PlinthError::DependencyConflict {
                package: batch
                    .iter()
                    .map(|def| def.identity.to_string())
                    .collect::<Vec<_>>()
                    .join(", "),
                details,
            });
        }
        report.warn_forced(format!("breaking installed dependencies: {}", details));
        report.broken = broken;
        Ok(())
    }

    async fn acquire_lock(&self) -> InstallerResult<InstallLock> {
        let path = self.installer.lock_path();
        tokio::task::spawn_blocking(move || InstallLock::acquire(path))
            .await
            .map_err(|e| PlinthError::InstallFailure {
                package: "install lock".to_string(),
                message: e.to_string(),
                source: Some(Box::new(e)),
            })?
    }
}

fn record_fetched(report: &mut InstallReport, fetched: &[FetchedArtifact]) {
    for artifact in fetched {
        if artifact.cached {
            report.cached.push(artifact.identity.clone());
        } else {
            report.downloaded.push(artifact.identity.clone());
        }
    }
}

fn as_install_failure(package: &str, error: PlinthError) -> PlinthError {
    match error {
        PlinthError::InstallFailure { .. } | PlinthError::Cancelled => error,
        other => PlinthError::install(package, other),
    }
}
