//! Configuration parsing for Plinth
//!
//! This crate handles parsing and validation of `plinth.toml` files and the
//! layering of global, project, environment and command-line settings into
//! one effective configuration.

pub mod merge;
pub mod toml;

// Re-export main types
pub use merge::{ConfigLayering, ConfigLoader, ConfigSource, CONFIG_FILE_NAME, ENV_PREFIX};
pub use self::toml::{parse_plinth_toml, serialize_plinth_toml, PlinthToml, RepositoryEntry, Settings};

use plinth_core::error::PlinthError;

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, PlinthError>;
