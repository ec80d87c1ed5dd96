//! Turning user requests into concrete root definitions
//!
//! Named requests pick the highest matching version across the repository
//! list, then narrow that version's variants by operating system and then
//! architecture. Bundles (several builds of one logical package) go through
//! the same narrowing. Anything still ambiguous is a configuration error.

use std::collections::HashMap;

use plinth_core::{
    os_compatible, Architecture, PackageDefinition, PackageSpecifier, PlinthError,
    VersionSpecifier,
};
use plinth_registry::RepositoryIndex;
use plinth_resolver::VersionSelector;
use tracing::{debug, info};

use crate::options::InstallOptions;
use crate::InstallerResult;

/// One thing the user asked to install
#[derive(Debug, Clone)]
pub enum PackageRequest {
    /// Look the package up in the repositories
    Named(PackageSpecifier),
    /// A definition the caller already has, e.g. read from a local archive
    Definition(PackageDefinition),
    /// Variants of one package, narrowed by platform
    Bundle(Vec<PackageDefinition>),
}

impl PackageRequest {
    /// Request the newest version of `name` matching `version`
    pub fn named(name: impl Into<String>, version: VersionSpecifier) -> Self {
        PackageRequest::Named(PackageSpecifier::named(name).with_version(version))
    }
}

/// Resolve every request to one definition, in request order
pub fn gather_roots(
    requests: &[PackageRequest],
    indexes: &[&RepositoryIndex],
    options: &InstallOptions,
) -> InstallerResult<Vec<PackageDefinition>> {
    let mut roots: Vec<PackageDefinition> = Vec::with_capacity(requests.len());
    for request in requests {
        let definition = match request {
            PackageRequest::Named(specifier) => find_named(specifier, indexes, options)?,
            PackageRequest::Definition(definition) => definition.clone(),
            PackageRequest::Bundle(variants) => {
                let name = variants
                    .first()
                    .map(|def| def.name().to_string())
                    .unwrap_or_default();
                select_variant(&name, variants.clone(), options)?
            },
        };
        if roots.iter().any(|root| root.name() == definition.name()) {
            debug!(package = %definition.identity, "duplicate request ignored");
            continue;
        }
        roots.push(definition);
    }
    Ok(roots)
}

/// Drop roots that are installed at exactly the same identity
pub fn drop_installed(
    roots: Vec<PackageDefinition>,
    installed: &HashMap<String, PackageDefinition>,
) -> Vec<PackageDefinition> {
    roots
        .into_iter()
        .filter(|root| {
            let present = installed
                .get(root.name())
                .is_some_and(|current| current.identity == root.identity);
            if present {
                info!(package = %root.identity, "already installed");
            }
            !present
        })
        .collect()
}

fn find_named(
    specifier: &PackageSpecifier,
    indexes: &[&RepositoryIndex],
    options: &InstallOptions,
) -> InstallerResult<PackageDefinition> {
    let name = specifier.name.as_deref().ok_or_else(|| PlinthError::ConfigValidation {
        field: "package".to_string(),
        reason: "a package request needs a name".to_string(),
    })?;

    let selector = VersionSelector::new(indexes.iter().copied());
    let Some(best) = selector.select_version(specifier, |def| fits_platform(def, options)) else {
        return Err(PlinthError::PackageNotFound {
            name: name.to_string(),
            version: specifier.version.to_string(),
        });
    };

    // Variants of the chosen version come from the first repository that
    // has one for this platform
    let query = PackageSpecifier::named(name)
        .with_version(VersionSpecifier::exact(&best))
        .with_architecture(specifier.architecture)
        .with_os(specifier.os.clone());
    let variants = indexes
        .iter()
        .map(|index| {
            index
                .get_packages(&query, &[])
                .into_iter()
                .filter(|def| fits_platform(def, options))
                .collect::<Vec<_>>()
        })
        .find(|found| !found.is_empty())
        .unwrap_or_default();

    debug!(package = name, version = %best, variants = variants.len(), "gathered candidate");
    select_variant(name, variants, options)
}

fn fits_platform(definition: &PackageDefinition, options: &InstallOptions) -> bool {
    os_compatible(options.os.as_deref(), definition.identity.os.as_deref())
        && options.architecture.is_compatible_with(definition.identity.architecture)
}

/// Narrow variants by OS, then architecture, preferring exact architecture builds
fn select_variant(
    name: &str,
    variants: Vec<PackageDefinition>,
    options: &InstallOptions,
) -> InstallerResult<PackageDefinition> {
    let requested = describe_platform(options);

    let mut remaining: Vec<PackageDefinition> = variants
        .into_iter()
        .filter(|def| fits_platform(def, options))
        .collect();

    if remaining.len() > 1 && !options.architecture.is_neutral() {
        let exact: Vec<PackageDefinition> = remaining
            .iter()
            .filter(|def| def.identity.architecture == options.architecture)
            .cloned()
            .collect();
        if !exact.is_empty() {
            remaining = exact;
        }
    }

    match remaining.len() {
        0 => Err(PlinthError::PackageNotFound {
            name: name.to_string(),
            version: requested,
        }),
        1 => Ok(remaining.remove(0)),
        _ => Err(PlinthError::AmbiguousPackage {
            name: name.to_string(),
            variants: remaining
                .iter()
                .map(|def| match &def.identity.os {
                    Some(os) => format!("{} [{}]", def.identity, os),
                    None => def.identity.to_string(),
                })
                .collect::<Vec<_>>()
                .join(", "),
        }),
    }
}

fn describe_platform(options: &InstallOptions) -> String {
    match (&options.os, options.architecture) {
        (Some(os), Architecture::Unspecified) => format!("for {}", os),
        (Some(os), arch) => format!("for {} {}", os, arch),
        (None, Architecture::Unspecified) => "any platform".to_string(),
        (None, arch) => format!("for {}", arch),
    }
}
