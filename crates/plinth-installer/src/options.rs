//! Per-run installation options

use std::time::Duration;

use plinth_core::{Architecture, MissingDependencyPolicy};

/// Switches that shape one orchestrator run
#[derive(Debug, Clone, Default)]
pub struct InstallOptions {
    /// Turn conflict, consistency and unresolved-dependency errors into warnings
    pub force: bool,
    /// Stop after the checks, before anything is downloaded
    pub check_only: bool,
    /// Allow the decision prompt to settle overwrite conflicts
    pub interactive: bool,
    pub missing_dependencies: MissingDependencyPolicy,
    /// Requested operating system, used to pick between variants
    pub os: Option<String>,
    /// Requested architecture, used to pick between variants
    pub architecture: Architecture,
    /// Wall-clock limit for the whole workflow
    pub timeout: Option<Duration>,
}

impl InstallOptions {
    pub fn forced(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn check_only(mut self, check_only: bool) -> Self {
        self.check_only = check_only;
        self
    }

    pub fn interactive(mut self, interactive: bool) -> Self {
        self.interactive = interactive;
        self
    }

    pub fn with_missing_dependencies(mut self, policy: MissingDependencyPolicy) -> Self {
        self.missing_dependencies = policy;
        self
    }

    pub fn with_platform(mut self, os: Option<String>, architecture: Architecture) -> Self {
        self.os = os;
        self.architecture = architecture;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}
