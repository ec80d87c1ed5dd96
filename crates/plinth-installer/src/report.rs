//! What an orchestrator run did

use std::fmt;
use std::path::PathBuf;

use plinth_core::PackageIdentity;
use plinth_resolver::{BrokenDependency, FileConflict, ResolutionResult};

/// Orchestrator state machine phases, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    GatherSpecifiers,
    ResolvePackages,
    CheckOverwriteConflicts,
    CheckDependencyConsistency,
    Download,
    UninstallSuperseded,
    OrderAndInstall,
    Done,
    Failed,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::GatherSpecifiers => "gather",
            Phase::ResolvePackages => "resolve",
            Phase::CheckOverwriteConflicts => "check-overwrite",
            Phase::CheckDependencyConsistency => "check-consistency",
            Phase::Download => "download",
            Phase::UninstallSuperseded => "uninstall-superseded",
            Phase::OrderAndInstall => "install",
            Phase::Done => "done",
            Phase::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// How a successful run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InstallOutcome {
    /// Every requested package was already installed
    #[default]
    NothingToDo,
    /// All checks passed and nothing was changed
    CheckOnly,
    Completed,
}

/// Record of a successful orchestrator run
#[derive(Debug, Clone, Default)]
pub struct InstallReport {
    pub outcome: InstallOutcome,
    /// Phases entered, in order
    pub phases: Vec<Phase>,
    /// Packages the request resolved to
    pub requested: Vec<PackageIdentity>,
    pub resolution: ResolutionResult,
    /// Overwrite conflicts that were overridden
    pub conflicts: Vec<FileConflict>,
    /// Broken dependencies that were overridden
    pub broken: Vec<BrokenDependency>,
    /// Packages fetched from a repository
    pub downloaded: Vec<PackageIdentity>,
    /// Packages served from the artifact cache
    pub cached: Vec<PackageIdentity>,
    pub uninstalled: Vec<PackageIdentity>,
    /// Packages installed, in install order
    pub installed: Vec<PackageIdentity>,
    /// Archives left on disk by a fetch
    pub artifacts: Vec<PathBuf>,
    /// Problems that `force` or a prompt let through
    pub warnings: Vec<String>,
}

impl InstallReport {
    /// Process exit code for this outcome
    pub fn exit_code(&self) -> u8 {
        match self.outcome {
            InstallOutcome::NothingToDo => 2,
            InstallOutcome::CheckOnly | InstallOutcome::Completed => 0,
        }
    }

    pub(crate) fn enter(&mut self, phase: Phase) {
        tracing::info!(phase = %phase, "entering phase");
        self.phases.push(phase);
    }

    pub(crate) fn warn_forced(&mut self, message: String) {
        tracing::warn!(forced = true, "{}", message);
        self.warnings.push(message);
    }
}
