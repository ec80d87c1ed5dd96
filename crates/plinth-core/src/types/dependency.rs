//! Dependency declarations.
//!
//! A package declares each dependency as a name plus a version specifier.

use super::{SemanticVersion, VersionSpecifier};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Dependency declared by a dependent package
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PackageDependency {
    pub name: String,
    #[serde(default)]
    pub version: VersionSpecifier,
}

impl PackageDependency {
    /// Create a new dependency
    pub fn new(name: impl Into<String>, version: VersionSpecifier) -> Self {
        Self {
            name: name.into(),
            version,
        }
    }

    /// Create a dependency accepting any version
    pub fn any(name: impl Into<String>) -> Self {
        Self::new(name, VersionSpecifier::ANY)
    }

    /// Check whether a package called `name` at `version` satisfies this dependency
    pub fn is_satisfied_by(&self, name: &str, version: &SemanticVersion) -> bool {
        self.name == name && self.version.is_compatible(version)
    }
}

impl fmt::Display for PackageDependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dependency_creation() {
        let spec = VersionSpecifier::parse("^1.0").unwrap();
        let dep = PackageDependency::new("Core", spec.clone());

        assert_eq!(dep.name, "Core");
        assert_eq!(dep.version, spec);
        assert_eq!(dep.to_string(), "Core ^1.0");
        assert_eq!(PackageDependency::any("Core").to_string(), "Core Any");
    }

    #[test]
    fn test_is_satisfied_by() {
        let dep = PackageDependency::new("Core", VersionSpecifier::parse("^1.2").unwrap());
        assert!(dep.is_satisfied_by("Core", &SemanticVersion::new(1, 4, 0)));
        assert!(!dep.is_satisfied_by("Core", &SemanticVersion::new(2, 0, 0)));
        assert!(!dep.is_satisfied_by("Other", &SemanticVersion::new(1, 4, 0)));
    }

    #[test]
    fn test_missing_version_defaults_to_any() {
        let dep: PackageDependency = serde_json::from_str(r#"{ "name": "Core" }"#).unwrap();
        assert!(dep.version.is_any());
    }
}
