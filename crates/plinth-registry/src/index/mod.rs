//! In-memory repository index and package queries
//!
//! A `RepositoryIndex` is the loaded, read-only contents of one repository.
//! Queries can be restricted to candidates that keep an existing set of
//! packages (normally the installed ones) consistent.

use plinth_core::{PackageDefinition, PackageIdentity, PackageSpecifier, SemanticVersion};
use plinth_core::PlinthError;

use crate::api::{IndexDocument, INDEX_FORMAT_VERSION};
use crate::RegistryResult;

/// Loaded contents of one repository
#[derive(Debug, Clone, Default)]
pub struct RepositoryIndex {
    location: String,
    packages: Vec<PackageDefinition>,
}

impl RepositoryIndex {
    /// Build an index, stamping every definition with `location` as its source
    pub fn new(location: impl Into<String>, packages: Vec<PackageDefinition>) -> Self {
        let location = location.into();
        let packages = packages
            .into_iter()
            .map(|mut def| {
                def.source = Some(location.clone());
                def
            })
            .collect();
        Self { location, packages }
    }

    /// Build an index from a parsed `index.json`
    pub fn from_document(location: impl Into<String>, document: IndexDocument) -> RegistryResult<Self> {
        let location = location.into();
        if document.format_version > INDEX_FORMAT_VERSION {
            return Err(PlinthError::ConfigValidation {
                field: "formatVersion".to_string(),
                reason: format!(
                    "index at {} uses format {}, newest supported is {}",
                    location, document.format_version, INDEX_FORMAT_VERSION
                ),
            });
        }
        Ok(Self::new(location, document.packages))
    }

    /// Parse raw `index.json` bytes
    pub fn from_json(location: impl Into<String>, bytes: &[u8]) -> RegistryResult<Self> {
        let location = location.into();
        let document: IndexDocument = serde_json::from_slice(bytes).map_err(|e| {
            PlinthError::network(format!("Invalid repository index at {}: {}", location, e), e)
        })?;
        Self::from_document(location, document)
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn packages(&self) -> &[PackageDefinition] {
        &self.packages
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    /// Distinct versions of `name`, highest first
    pub fn get_package_versions(
        &self,
        name: &str,
        compatible_with: &[PackageDefinition],
    ) -> Vec<SemanticVersion> {
        let mut versions: Vec<SemanticVersion> = self
            .packages
            .iter()
            .filter(|def| def.name() == name && keeps_consistent(def, compatible_with))
            .map(|def| def.version().clone())
            .collect();
        versions.sort_by(|a, b| b.cmp(a));
        versions.dedup();
        versions
    }

    /// All definitions matching `specifier`, restricted by `compatible_with`
    pub fn get_packages(
        &self,
        specifier: &PackageSpecifier,
        compatible_with: &[PackageDefinition],
    ) -> Vec<PackageDefinition> {
        self.packages
            .iter()
            .filter(|def| specifier.matches(&def.identity) && keeps_consistent(def, compatible_with))
            .cloned()
            .collect()
    }

    /// Look up one exact identity
    pub fn find(&self, identity: &PackageIdentity) -> Option<&PackageDefinition> {
        self.packages.iter().find(|def| def.identity == *identity)
    }
}

/// Check that adding `candidate` leaves `existing` consistent.
///
/// Every existing package that depends on the candidate's name must accept
/// the candidate's version, and every dependency the candidate declares on
/// an existing package must accept that package's version. An empty
/// `existing` set accepts everything.
pub fn keeps_consistent(candidate: &PackageDefinition, existing: &[PackageDefinition]) -> bool {
    let accepted_by_dependents = existing
        .iter()
        .filter(|pkg| pkg.name() != candidate.name())
        .filter_map(|pkg| pkg.dependency_on(candidate.name()))
        .all(|dep| dep.version.is_compatible(candidate.version()));

    let accepts_existing = candidate.dependencies.iter().all(|dep| {
        existing
            .iter()
            .filter(|pkg| pkg.name() == dep.name)
            .all(|pkg| dep.version.is_compatible(pkg.version()))
    });

    accepted_by_dependents && accepts_existing
}
