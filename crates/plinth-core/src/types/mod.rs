//! Core data types for Plinth package management.
//!
//! This module provides the fundamental types used throughout Plinth:
//! - Semantic versions and version specifiers
//! - Package identities, queries and definitions
//! - Dependency declarations
//! - Install policy settings

pub mod dependency;
pub mod package;
pub mod policy;
pub mod specifier;
pub mod version;

// Re-export all public types
pub use dependency::PackageDependency;
pub use package::{
    host_os, os_compatible, Architecture, OwnedFile, PackageDefinition, PackageIdentity,
    PackageSpecifier,
};
pub use policy::MissingDependencyPolicy;
pub use specifier::{compare_prerelease, MatchBehavior, VersionSpecifier};
pub use version::SemanticVersion;
