//! Package archive extraction
//!
//! Extraction validates every entry path so nothing lands outside the
//! destination directory.

use flate2::read::GzDecoder;
use plinth_core::error::PlinthError;
use plinth_core::PackageDefinition;
use std::fs;
use std::io::Read;
use std::path::{Component, Path, PathBuf};
use tar::Archive;
use tracing::debug;

use super::MANIFEST_FILE_NAME;
use crate::CacheResult;

fn archive_error(e: std::io::Error) -> PlinthError {
    PlinthError::io("Failed to read package archive".to_string(), e)
}

/// Read the manifest from a package archive without extracting payload
pub fn read_package_manifest<R: Read>(reader: R) -> CacheResult<PackageDefinition> {
    let mut archive = Archive::new(GzDecoder::new(reader));

    for entry_result in archive.entries().map_err(archive_error)? {
        let mut entry = entry_result.map_err(archive_error)?;
        let path = entry.path().map_err(archive_error)?.into_owned();
        if !is_manifest(&path) {
            continue;
        }

        let mut content = String::new();
        entry.read_to_string(&mut content).map_err(archive_error)?;
        return serde_json::from_str(&content).map_err(|e| PlinthError::IntegrityFailure {
            package: path.display().to_string(),
            expected: "valid package manifest".to_string(),
            actual: e.to_string(),
        });
    }

    Err(PlinthError::IntegrityFailure {
        package: "archive".to_string(),
        expected: format!("{} at archive root", MANIFEST_FILE_NAME),
        actual: "no manifest".to_string(),
    })
}

/// Read the manifest of the archive stored at `path`
pub fn read_package_manifest_file(path: &Path) -> CacheResult<PackageDefinition> {
    let file = fs::File::open(path)
        .map_err(|e| PlinthError::io(format!("Failed to open {}", path.display()), e))?;
    read_package_manifest(file)
}

/// Extract the payload of a package archive into `dest_dir`.
///
/// The manifest itself is skipped. Returns the extracted file paths relative
/// to `dest_dir`, in archive order.
pub fn extract_package<R: Read>(reader: R, dest_dir: &Path) -> CacheResult<Vec<PathBuf>> {
    let mut archive = Archive::new(GzDecoder::new(reader));

    fs::create_dir_all(dest_dir)
        .map_err(|e| PlinthError::io(format!("Failed to create {}", dest_dir.display()), e))?;

    let mut extracted = Vec::new();
    for entry_result in archive.entries().map_err(archive_error)? {
        let mut entry = entry_result.map_err(archive_error)?;
        let entry_path = entry.path().map_err(archive_error)?.into_owned();
        if is_manifest(&entry_path) {
            continue;
        }

        let relative = validate_extract_path(&entry_path)?;
        if relative.as_os_str().is_empty() {
            continue;
        }
        let target = dest_dir.join(&relative);

        match entry.header().entry_type() {
            tar::EntryType::Regular => {
                if let Some(parent) = target.parent() {
                    fs::create_dir_all(parent)
                        .map_err(|e| PlinthError::io("Failed to create directory".to_string(), e))?;
                }
                let mut file = fs::File::create(&target)
                    .map_err(|e| PlinthError::io(format!("Failed to create {}", target.display()), e))?;
                std::io::copy(&mut entry, &mut file)
                    .map_err(|e| PlinthError::io(format!("Failed to write {}", target.display()), e))?;

                #[cfg(unix)]
                {
                    use std::os::unix::fs::PermissionsExt;
                    if let Ok(mode) = entry.header().mode() {
                        let _ = fs::set_permissions(&target, fs::Permissions::from_mode(mode));
                    }
                }

                extracted.push(relative);
            },
            tar::EntryType::Directory => {
                fs::create_dir_all(&target)
                    .map_err(|e| PlinthError::io("Failed to create directory".to_string(), e))?;
            },
            other => {
                // Links and device nodes are not part of the package format
                debug!(path = %entry_path.display(), kind = ?other, "skipping archive entry");
            },
        }
    }

    Ok(extracted)
}

fn is_manifest(path: &Path) -> bool {
    let mut components = path
        .components()
        .filter(|component| !matches!(component, Component::CurDir));
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(name)), None) if name == MANIFEST_FILE_NAME
    )
}

/// Relative path for an archive entry, rejecting traversal and absolute paths
fn validate_extract_path(entry_path: &Path) -> CacheResult<PathBuf> {
    let mut safe_path = PathBuf::new();

    for component in entry_path.components() {
        match component {
            Component::Normal(name) => safe_path.push(name),
            Component::CurDir => {},
            Component::ParentDir => {
                return Err(PlinthError::IntegrityFailure {
                    package: "archive".to_string(),
                    expected: "safe path".to_string(),
                    actual: format!("directory traversal: {}", entry_path.display()),
                });
            },
            Component::RootDir | Component::Prefix(_) => {
                return Err(PlinthError::IntegrityFailure {
                    package: "archive".to_string(),
                    expected: "relative path".to_string(),
                    actual: format!("absolute path: {}", entry_path.display()),
                });
            },
        }
    }

    Ok(safe_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tarball::package_archive_bytes;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Cursor;
    use tar::Builder;
    use tempfile::tempdir;

    fn definition() -> PackageDefinition {
        PackageDefinition::parse("Viewer", "1.2.0").unwrap()
    }

    #[test]
    fn test_manifest_and_payload() {
        let bytes = package_archive_bytes(
            &definition(),
            &[("bin/viewer", b"#!/bin/sh".as_slice()), ("share/readme.txt", b"hi".as_slice())],
        )
        .unwrap();

        let manifest = read_package_manifest(Cursor::new(&bytes)).unwrap();
        assert_eq!(manifest.identity, definition().identity);
        assert_eq!(manifest.files.len(), 2);

        let dir = tempdir().unwrap();
        let extracted = extract_package(Cursor::new(&bytes), dir.path()).unwrap();
        assert_eq!(
            extracted,
            vec![PathBuf::from("bin/viewer"), PathBuf::from("share/readme.txt")]
        );
        assert_eq!(fs::read_to_string(dir.path().join("share/readme.txt")).unwrap(), "hi");
        assert!(!dir.path().join(MANIFEST_FILE_NAME).exists());
    }

    #[test]
    fn test_missing_manifest() {
        let mut data = Vec::new();
        {
            let mut builder = Builder::new(GzEncoder::new(&mut data, Compression::default()));
            let mut header = tar::Header::new_gnu();
            header.set_path("payload.txt").unwrap();
            header.set_size(4);
            header.set_cksum();
            builder.append(&header, "data".as_bytes()).unwrap();
            builder.into_inner().unwrap().finish().unwrap();
        }

        let err = read_package_manifest(Cursor::new(data)).unwrap_err();
        assert!(matches!(err, PlinthError::IntegrityFailure { .. }));
    }

    #[test]
    fn test_validate_extract_path() {
        assert_eq!(
            validate_extract_path(Path::new("./bin/tool")).unwrap(),
            PathBuf::from("bin/tool")
        );
        assert!(validate_extract_path(Path::new("safe/../../etc/passwd")).is_err());
        assert!(validate_extract_path(Path::new("/etc/passwd")).is_err());
    }

    #[test]
    fn test_is_manifest() {
        assert!(is_manifest(Path::new(MANIFEST_FILE_NAME)));
        assert!(is_manifest(&Path::new(".").join(MANIFEST_FILE_NAME)));
        assert!(!is_manifest(&Path::new("nested").join(MANIFEST_FILE_NAME)));
    }
}
