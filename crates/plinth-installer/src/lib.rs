//! Installation orchestration for Plinth
//!
//! Drives a request through gather, resolve, conflict and consistency
//! checks, download, removal of superseded versions and ordered install.
//! The orchestrator owns no global state: repositories, the installer,
//! the user prompt and the cache handle are all passed in.

pub mod collaborator;
pub mod download;
pub mod gather;
pub mod options;
pub mod orchestrator;
pub mod prompt;
pub mod report;
pub mod uninstall;

// Re-export main types
pub use collaborator::PackageInstaller;
pub use download::CacheHandle;
pub use gather::PackageRequest;
pub use options::InstallOptions;
pub use orchestrator::InstallationOrchestrator;
pub use prompt::{DecisionPrompt, NonInteractive, OverwriteDecision};
pub use report::{InstallOutcome, InstallReport, Phase};
pub use uninstall::UninstallPlan;

pub use plinth_core::MissingDependencyPolicy;

use plinth_core::error::PlinthError;

/// Result type for installer operations
pub type InstallerResult<T> = Result<T, PlinthError>;
