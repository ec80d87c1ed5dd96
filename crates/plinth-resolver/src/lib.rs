//! Dependency resolution engine for Plinth
//!
//! This crate holds the pure planning algorithms: transitive dependency
//! resolution against installed packages and repositories, file-ownership
//! conflict detection, installed-graph consistency checks and install
//! ordering. Nothing here performs I/O.

pub mod conflict;
pub mod consistency;
pub mod order;
pub mod resolve;
pub mod semver;

// Re-export main types
pub use conflict::{group_by_offender, ConflictDetector, FileConflict};
pub use consistency::{describe_broken, find_broken_dependencies, BrokenDependency};
pub use order::InstallOrderer;
pub use resolve::{DependencyResolver, ResolutionResult, UnknownDependency};
pub use semver::VersionSelector;
