//! Package archive format
//!
//! A package archive is a gzipped tar with a `plinth.package.json` manifest
//! (the serialized `PackageDefinition`) at its root and payload files at the
//! paths they are installed to, relative to the install target.

pub mod create;
pub mod extract;

pub use create::{create_package_archive, package_archive_bytes};
pub use extract::{extract_package, read_package_manifest, read_package_manifest_file};

/// Name of the manifest entry at the archive root
pub const MANIFEST_FILE_NAME: &str = "plinth.package.json";
