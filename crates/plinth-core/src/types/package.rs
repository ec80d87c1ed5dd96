//! Package identity, query and definition types.
//!
//! A `PackageIdentity` names one concrete build of a package, a
//! `PackageSpecifier` is a query over identities, and a `PackageDefinition`
//! is the resolvable unit: identity, declared dependencies and owned files.

use super::{PackageDependency, SemanticVersion, VersionSpecifier};
use crate::error::{PlinthError, PlinthResult};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Target processor architecture of a package build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Architecture {
    #[default]
    Unspecified,
    AnyCpu,
    X86,
    X64,
    Arm,
    Arm64,
}

impl Architecture {
    /// Architecture of the running process
    pub fn host() -> Self {
        match std::env::consts::ARCH {
            "x86" => Architecture::X86,
            "x86_64" => Architecture::X64,
            "arm" => Architecture::Arm,
            "aarch64" => Architecture::Arm64,
            _ => Architecture::Unspecified,
        }
    }

    /// Check if this is a wildcard architecture
    pub fn is_neutral(self) -> bool {
        matches!(self, Architecture::Unspecified | Architecture::AnyCpu)
    }

    /// Two architectures are compatible when equal or when either is neutral
    pub fn is_compatible_with(self, other: Architecture) -> bool {
        self == other || self.is_neutral() || other.is_neutral()
    }
}

impl FromStr for Architecture {
    type Err = PlinthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "unspecified" => Ok(Architecture::Unspecified),
            "anycpu" | "any" => Ok(Architecture::AnyCpu),
            "x86" | "i686" => Ok(Architecture::X86),
            "x64" | "amd64" | "x86_64" => Ok(Architecture::X64),
            "arm" => Ok(Architecture::Arm),
            "arm64" | "aarch64" => Ok(Architecture::Arm64),
            _ => Err(PlinthError::ConfigValidation {
                field: "architecture".to_string(),
                reason: format!("unknown architecture '{}'", s),
            }),
        }
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Architecture::Unspecified => "Unspecified",
            Architecture::AnyCpu => "AnyCPU",
            Architecture::X86 => "x86",
            Architecture::X64 => "x64",
            Architecture::Arm => "arm",
            Architecture::Arm64 => "arm64",
        };
        f.write_str(name)
    }
}

impl Serialize for Architecture {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Architecture {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

/// Name of the running operating system as used in package OS lists
pub fn host_os() -> String {
    match std::env::consts::OS {
        "windows" => "Windows".to_string(),
        "linux" => "Linux".to_string(),
        "macos" => "MacOS".to_string(),
        other => other.to_string(),
    }
}

/// Check two comma-separated OS lists for overlap.
///
/// `None` or an empty list means any OS.
pub fn os_compatible(a: Option<&str>, b: Option<&str>) -> bool {
    let entries = |list: &str| -> Vec<String> {
        list.split(',')
            .map(|os| os.trim().to_ascii_lowercase())
            .filter(|os| !os.is_empty())
            .collect()
    };
    let (a, b) = match (a.map(entries), b.map(entries)) {
        (Some(a), Some(b)) if !a.is_empty() && !b.is_empty() => (a, b),
        _ => return true,
    };
    a.iter().any(|os| b.contains(os))
}

/// One concrete build of a package
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PackageIdentity {
    pub name: String,
    pub version: SemanticVersion,
    #[serde(default)]
    pub architecture: Architecture,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os: Option<String>,
}

impl PackageIdentity {
    pub fn new(name: impl Into<String>, version: SemanticVersion) -> Self {
        Self {
            name: name.into(),
            version,
            architecture: Architecture::Unspecified,
            os: None,
        }
    }

    pub fn with_architecture(mut self, architecture: Architecture) -> Self {
        self.architecture = architecture;
        self
    }

    pub fn with_os(mut self, os: impl Into<String>) -> Self {
        self.os = Some(os.into());
        self
    }

    /// Stable key for caches: `name@version@arch`
    pub fn cache_key(&self) -> String {
        format!("{}@{}@{}", self.name, self.version, self.architecture)
    }
}

impl fmt::Display for PackageIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.version)?;
        if self.architecture != Architecture::Unspecified {
            write!(f, " ({})", self.architecture)?;
        }
        Ok(())
    }
}

/// Query over package identities
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct PackageSpecifier {
    pub name: Option<String>,
    pub version: VersionSpecifier,
    pub architecture: Architecture,
    pub os: Option<String>,
}

impl PackageSpecifier {
    /// Query for any version of `name`
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn with_version(mut self, version: VersionSpecifier) -> Self {
        self.version = version;
        self
    }

    pub fn with_architecture(mut self, architecture: Architecture) -> Self {
        self.architecture = architecture;
        self
    }

    pub fn with_os(mut self, os: Option<String>) -> Self {
        self.os = os;
        self
    }

    /// Check whether `identity` satisfies every constraint of this query
    pub fn matches(&self, identity: &PackageIdentity) -> bool {
        self.name.as_deref().map_or(true, |name| name == identity.name)
            && self.version.is_compatible(&identity.version)
            && self.architecture.is_compatible_with(identity.architecture)
            && os_compatible(self.os.as_deref(), identity.os.as_deref())
    }
}

impl fmt::Display for PackageSpecifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name.as_deref().unwrap_or("*"), self.version)
    }
}

/// A file placed on disk by a package
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OwnedFile {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
}

impl OwnedFile {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            owner: None,
        }
    }
}

/// Resolvable package unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageDefinition {
    #[serde(flatten)]
    pub identity: PackageIdentity,
    #[serde(default)]
    pub dependencies: Vec<PackageDependency>,
    #[serde(default)]
    pub files: Vec<OwnedFile>,
    /// Archive location, relative to the repository root unless absolute
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact: Option<String>,
    /// Blake3 hex digest of the archive
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
    /// Repository this definition was read from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl PackageDefinition {
    pub fn new(identity: PackageIdentity) -> Self {
        Self {
            identity,
            dependencies: Vec::new(),
            files: Vec::new(),
            artifact: None,
            checksum: None,
            source: None,
        }
    }

    /// Shorthand used heavily by tests and fixtures
    pub fn parse(name: &str, version: &str) -> PlinthResult<Self> {
        Ok(Self::new(PackageIdentity::new(name, version.parse()?)))
    }

    pub fn with_dependency(mut self, name: impl Into<String>, version: VersionSpecifier) -> Self {
        self.dependencies.push(PackageDependency::new(name, version));
        self
    }

    pub fn with_file(mut self, path: impl Into<String>) -> Self {
        self.files.push(OwnedFile::new(path));
        self
    }

    pub fn with_artifact(mut self, artifact: impl Into<String>) -> Self {
        self.artifact = Some(artifact.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.identity.name
    }

    pub fn version(&self) -> &SemanticVersion {
        &self.identity.version
    }

    /// Find this package's declared dependency on `name`
    pub fn dependency_on(&self, name: &str) -> Option<&PackageDependency> {
        self.dependencies.iter().find(|dep| dep.name == name)
    }
}

impl fmt::Display for PackageDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.identity.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_architecture_parse_and_display() {
        assert_eq!("x64".parse::<Architecture>().unwrap(), Architecture::X64);
        assert_eq!("AMD64".parse::<Architecture>().unwrap(), Architecture::X64);
        assert_eq!("AnyCPU".parse::<Architecture>().unwrap(), Architecture::AnyCpu);
        assert_eq!("aarch64".parse::<Architecture>().unwrap(), Architecture::Arm64);
        assert!("sparc".parse::<Architecture>().is_err());
        assert_eq!(Architecture::AnyCpu.to_string(), "AnyCPU");
    }

    #[test]
    fn test_architecture_compatibility() {
        assert!(Architecture::X64.is_compatible_with(Architecture::X64));
        assert!(Architecture::X64.is_compatible_with(Architecture::AnyCpu));
        assert!(Architecture::Unspecified.is_compatible_with(Architecture::Arm));
        assert!(!Architecture::X64.is_compatible_with(Architecture::X86));
    }

    #[test]
    fn test_os_compatibility() {
        assert!(os_compatible(None, Some("Windows")));
        assert!(os_compatible(Some(""), Some("Linux")));
        assert!(os_compatible(Some("Windows, Linux"), Some("linux")));
        assert!(!os_compatible(Some("Windows"), Some("Linux,MacOS")));
    }

    #[test]
    fn test_specifier_matches() {
        let identity = PackageIdentity::new("Tool", "1.4.0".parse().unwrap())
            .with_architecture(Architecture::X64)
            .with_os("Windows");

        let query = PackageSpecifier::named("Tool")
            .with_version(VersionSpecifier::parse("^1.2").unwrap());
        assert!(query.matches(&identity));

        let query = query.clone().with_os(Some("Linux".to_string()));
        assert!(!query.matches(&identity));

        assert!(!PackageSpecifier::named("Other").matches(&identity));
        assert!(PackageSpecifier::default().matches(&identity));
    }

    #[test]
    fn test_identity_display() {
        let identity = PackageIdentity::new("Tool", "2.0.0".parse().unwrap());
        assert_eq!(identity.to_string(), "Tool 2.0.0");
        let identity = identity.with_architecture(Architecture::Arm64);
        assert_eq!(identity.to_string(), "Tool 2.0.0 (arm64)");
        assert_eq!(identity.cache_key(), "Tool@2.0.0@arm64");
    }

    #[test]
    fn test_definition_json() {
        let json = r#"{
            "name": "Viewer",
            "version": "1.0.0",
            "architecture": "x64",
            "os": "Windows,Linux",
            "dependencies": [{ "name": "Core", "version": "^2.1" }],
            "files": [{ "path": "bin/viewer" }],
            "artifact": "viewer-1.0.0.tar.gz"
        }"#;
        let def: PackageDefinition = serde_json::from_str(json).unwrap();
        assert_eq!(def.name(), "Viewer");
        assert_eq!(def.identity.architecture, Architecture::X64);
        assert_eq!(def.dependencies[0].version.to_string(), "^2.1");
        assert_eq!(def.files[0].path, "bin/viewer");
        assert!(def.source.is_none());

        let back: PackageDefinition =
            serde_json::from_str(&serde_json::to_string(&def).unwrap()).unwrap();
        assert_eq!(back, def);
    }

    #[test]
    fn test_definition_defaults() {
        let def: PackageDefinition =
            serde_json::from_str(r#"{ "name": "Bare", "version": "0.1.0" }"#).unwrap();
        assert_eq!(def.identity.architecture, Architecture::Unspecified);
        assert!(def.dependencies.is_empty());
        assert!(def.files.is_empty());
    }
}
