//! Package archive creation
//!
//! Archives always start with the manifest so readers can stop early. When
//! the definition declares no files, the payload paths are recorded as its
//! owned files.

use flate2::write::GzEncoder;
use flate2::Compression;
use plinth_core::error::PlinthError;
use plinth_core::{OwnedFile, PackageDefinition};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tar::{Builder, Header};
use walkdir::WalkDir;

use super::MANIFEST_FILE_NAME;
use crate::CacheResult;

fn write_error(e: std::io::Error) -> PlinthError {
    PlinthError::io("Failed to write package archive".to_string(), e)
}

fn append_bytes<W: Write>(builder: &mut Builder<W>, path: &str, data: &[u8]) -> CacheResult<()> {
    let mut header = Header::new_gnu();
    header.set_size(data.len() as u64);
    header.set_mode(0o644);
    header.set_cksum();
    builder.append_data(&mut header, path, data).map_err(write_error)
}

fn manifest_with_files(definition: &PackageDefinition, payload: &[String]) -> CacheResult<Vec<u8>> {
    let mut manifest = definition.clone();
    if manifest.files.is_empty() {
        manifest.files = payload.iter().map(OwnedFile::new).collect();
    }
    serde_json::to_vec_pretty(&manifest).map_err(|e| {
        PlinthError::io(
            format!("Failed to serialize manifest for {}", definition.identity),
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()),
        )
    })
}

/// Write a package archive for `definition` with the files under `source_dir`
pub fn create_package_archive<W: Write>(
    writer: W,
    definition: &PackageDefinition,
    source_dir: &Path,
) -> CacheResult<()> {
    let mut files: Vec<(String, PathBuf)> = Vec::new();
    for entry in WalkDir::new(source_dir).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            PlinthError::io(
                format!("Failed to walk {}", source_dir.display()),
                std::io::Error::new(std::io::ErrorKind::Other, e.to_string()),
            )
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry.path().strip_prefix(source_dir).map_err(|e| {
            PlinthError::io(
                format!("Failed to strip prefix: {}", e),
                std::io::Error::new(std::io::ErrorKind::Other, e.to_string()),
            )
        })?;
        let name = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        files.push((name, entry.path().to_path_buf()));
    }

    let payload: Vec<String> = files.iter().map(|(name, _)| name.clone()).collect();
    let manifest = manifest_with_files(definition, &payload)?;

    let mut builder = Builder::new(GzEncoder::new(writer, Compression::default()));
    append_bytes(&mut builder, MANIFEST_FILE_NAME, &manifest)?;
    for (name, path) in &files {
        let mut file = fs::File::open(path)
            .map_err(|e| PlinthError::io(format!("Failed to open {}", path.display()), e))?;
        builder.append_file(name, &mut file).map_err(write_error)?;
    }

    builder
        .into_inner()
        .map_err(write_error)?
        .finish()
        .map_err(write_error)?;
    Ok(())
}

/// Build a package archive in memory from `(path, contents)` pairs
pub fn package_archive_bytes(
    definition: &PackageDefinition,
    files: &[(&str, &[u8])],
) -> CacheResult<Vec<u8>> {
    let payload: Vec<String> = files.iter().map(|(path, _)| path.to_string()).collect();
    let manifest = manifest_with_files(definition, &payload)?;

    let mut buffer = Vec::new();
    {
        let mut builder = Builder::new(GzEncoder::new(&mut buffer, Compression::default()));
        append_bytes(&mut builder, MANIFEST_FILE_NAME, &manifest)?;
        for (path, data) in files {
            append_bytes(&mut builder, path, data)?;
        }
        builder
            .into_inner()
            .map_err(write_error)?
            .finish()
            .map_err(write_error)?;
    }
    Ok(buffer)
}
