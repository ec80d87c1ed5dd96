//! Package arguments
//!
//! An argument is an archive path when it names an existing `*.tar.gz`
//! file, a bundle when it names a directory of such archives, and a
//! package name otherwise.

use std::fs::File;
use std::path::Path;

use plinth_cache::read_package_manifest;
use plinth_core::error::{PlinthError, PlinthResult};
use plinth_core::{PackageDefinition, VersionSpecifier};
use plinth_installer::PackageRequest;
use tracing::debug;
use walkdir::WalkDir;

const ARCHIVE_SUFFIX: &str = ".tar.gz";

/// Turn command-line package arguments into orchestrator requests
pub fn parse_requests(
    arguments: &[String],
    version: Option<&str>,
    cwd: &Path,
) -> PlinthResult<Vec<PackageRequest>> {
    let version = match version {
        Some(text) => VersionSpecifier::parse(text)?,
        None => VersionSpecifier::ANY,
    };

    arguments
        .iter()
        .map(|argument| parse_request(argument, &version, cwd))
        .collect()
}

fn parse_request(argument: &str, version: &VersionSpecifier, cwd: &Path) -> PlinthResult<PackageRequest> {
    let path = cwd.join(argument);

    if is_archive(&path) && path.is_file() {
        debug!(path = %path.display(), "local archive");
        return Ok(PackageRequest::Definition(read_local_archive(&path)?));
    }

    if path.is_dir() {
        let variants = WalkDir::new(&path)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_file() && is_archive(entry.path()))
            .map(|entry| read_local_archive(entry.path()))
            .collect::<PlinthResult<Vec<_>>>()?;
        if variants.is_empty() {
            return Err(PlinthError::ConfigValidation {
                field: "package".to_string(),
                reason: format!("{} contains no package archives", path.display()),
            });
        }
        debug!(path = %path.display(), variants = variants.len(), "local bundle");
        return Ok(PackageRequest::Bundle(variants));
    }

    if is_archive(Path::new(argument)) {
        return Err(PlinthError::io(
            format!("Package archive {} not found", path.display()),
            std::io::Error::from(std::io::ErrorKind::NotFound),
        ));
    }

    Ok(PackageRequest::named(argument, version.clone()))
}

fn is_archive(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.ends_with(ARCHIVE_SUFFIX))
}

/// Read the manifest of a local archive and point the definition at it.
///
/// `path` must be absolute.
pub fn read_local_archive(path: &Path) -> PlinthResult<PackageDefinition> {
    let file = File::open(path)
        .map_err(|e| PlinthError::io(format!("Failed to open {}", path.display()), e))?;
    let mut definition = read_package_manifest(file)?;

    definition.artifact = Some(path.to_string_lossy().into_owned());
    definition.source = None;
    definition.checksum = None;
    Ok(definition)
}
