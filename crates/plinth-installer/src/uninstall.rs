//! Uninstall planning
//!
//! Removing packages is checked the same way installing is: nothing left
//! installed may lose a dependency it needs. Removal runs dependents first.

use std::collections::HashMap;

use plinth_core::{PackageDefinition, PlinthError};
use plinth_resolver::{describe_broken, find_broken_dependencies, BrokenDependency, InstallOrderer};

use crate::InstallerResult;

/// Packages to remove and what their removal would break
#[derive(Debug, Clone)]
pub struct UninstallPlan {
    packages: Vec<PackageDefinition>,
    broken: Vec<BrokenDependency>,
}

impl UninstallPlan {
    /// Plan the removal of `names`; every name must be installed
    pub fn new(installed: &HashMap<String, PackageDefinition>, names: &[String]) -> InstallerResult<Self> {
        let mut packages: Vec<PackageDefinition> = Vec::with_capacity(names.len());
        for name in names {
            let definition = installed.get(name).ok_or_else(|| PlinthError::PackageNotFound {
                name: name.clone(),
                version: "installed".to_string(),
            })?;
            if !packages.iter().any(|planned| planned.name() == name) {
                packages.push(definition.clone());
            }
        }

        let removed: Vec<String> = packages.iter().map(|def| def.name().to_string()).collect();
        let broken = find_broken_dependencies(installed, &[], &removed);
        Ok(Self { packages, broken })
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    pub fn packages(&self) -> &[PackageDefinition] {
        &self.packages
    }

    /// Dependencies of remaining packages this plan would break
    pub fn broken(&self) -> &[BrokenDependency] {
        &self.broken
    }

    /// Error describing the broken dependencies, if any
    pub fn check(&self) -> InstallerResult<()> {
        if self.broken.is_empty() {
            return Ok(());
        }
        Err(PlinthError::DependencyConflict {
            package: self
                .packages
                .iter()
                .map(|def| def.identity.to_string())
                .collect::<Vec<_>>()
                .join(", "),
            details: describe_broken(&self.broken),
        })
    }

    /// Packages in removal order: dependents before their dependencies
    pub fn removal_order(&self) -> Vec<PackageDefinition> {
        InstallOrderer::new(self.packages.clone()).order_for_removal()
    }
}
