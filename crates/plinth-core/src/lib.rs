//! # plinth-core
//!
//! Core types and utilities shared across all Plinth crates.
//!
//! This crate provides:
//! - `SemanticVersion` and `VersionSpecifier` with exact, compatible and
//!   prerelease-aware matching
//! - Package identity, query and definition types
//! - `PlinthError` enum for unified error handling
//! - Path and hashing helpers
//!
//! ## Architecture
//!
//! The crate is organized into modules:
//! - `types`: Core data types (SemanticVersion, PackageDefinition, etc.)
//! - `error`: Error types and result aliases
//! - `utils`: Utility functions and helpers

pub mod error;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use error::{PlinthError, PlinthResult};
pub use types::{
    host_os, os_compatible, Architecture, MatchBehavior, MissingDependencyPolicy, OwnedFile,
    PackageDefinition, PackageDependency, PackageIdentity, PackageSpecifier, SemanticVersion,
    VersionSpecifier,
};
