//! Installed-graph consistency check
//!
//! Before changing what is installed, verify that no package outside the
//! current batch would be left with an unmet dependency.

use std::collections::HashMap;
use std::fmt;

use plinth_core::{PackageDefinition, PackageDependency, PackageIdentity, SemanticVersion};

/// An installed package whose dependency the operation would break
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokenDependency {
    /// Installed package left behind
    pub package: PackageIdentity,
    /// Its declared dependency
    pub dependency: PackageDependency,
    /// Version the operation leaves in place, `None` when removed
    pub provided: Option<SemanticVersion>,
}

impl fmt::Display for BrokenDependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.provided {
            Some(version) => write!(
                f,
                "{} requires {} but {} {} would be installed",
                self.package, self.dependency, self.dependency.name, version
            ),
            None => write!(
                f,
                "{} requires {} which would be removed",
                self.package, self.dependency
            ),
        }
    }
}

/// Find dependencies of installed packages that `incoming` or `removed` would break.
///
/// Packages that are themselves replaced or removed are not checked.
pub fn find_broken_dependencies(
    installed: &HashMap<String, PackageDefinition>,
    incoming: &[PackageDefinition],
    removed: &[String],
) -> Vec<BrokenDependency> {
    let incoming_by_name: HashMap<&str, &PackageDefinition> =
        incoming.iter().map(|def| (def.name(), def)).collect();

    let mut outside: Vec<&PackageDefinition> = installed
        .values()
        .filter(|def| !incoming_by_name.contains_key(def.name()))
        .filter(|def| !removed.iter().any(|name| name == def.name()))
        .collect();
    outside.sort_by(|a, b| a.name().cmp(b.name()));

    let mut broken = Vec::new();
    for package in outside {
        for dependency in &package.dependencies {
            let provided = if let Some(replacement) = incoming_by_name.get(dependency.name.as_str()) {
                Some(replacement.version())
            } else if removed.iter().any(|name| *name == dependency.name) {
                None
            } else {
                continue;
            };

            if provided.map_or(true, |version| !dependency.version.is_compatible(version)) {
                broken.push(BrokenDependency {
                    package: package.identity.clone(),
                    dependency: dependency.clone(),
                    provided: provided.cloned(),
                });
            }
        }
    }
    broken
}

/// Render a list of broken dependencies for an error message
pub fn describe_broken(broken: &[BrokenDependency]) -> String {
    broken
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
