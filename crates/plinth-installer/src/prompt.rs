//! User decisions the orchestrator may need mid-run

use plinth_core::PackageDefinition;
use plinth_resolver::FileConflict;

/// Answer to an overwrite conflict
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverwriteDecision {
    Cancel,
    OverwriteAnyway,
}

/// Source of interactive decisions
pub trait DecisionPrompt: Send + Sync {
    /// Whether to install `dependency`, which is required but not installed
    fn include_dependency(&self, dependency: &PackageDefinition) -> bool;

    /// How to proceed when incoming packages would overwrite owned files
    fn resolve_overwrite(&self, conflicts: &[FileConflict]) -> OverwriteDecision;
}

/// Prompt for unattended runs: declines everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NonInteractive;

impl DecisionPrompt for NonInteractive {
    fn include_dependency(&self, _dependency: &PackageDefinition) -> bool {
        false
    }

    fn resolve_overwrite(&self, _conflicts: &[FileConflict]) -> OverwriteDecision {
        OverwriteDecision::Cancel
    }
}
