//! Repository index wire format
//!
//! Every repository publishes an `index.json` at its root listing the
//! package definitions it offers. Archive locations in `artifact` are
//! relative to the repository root.

use plinth_core::PackageDefinition;
use serde::{Deserialize, Serialize};

/// File name of the index at a repository root
pub const INDEX_FILE_NAME: &str = "index.json";

/// Current index format revision
pub const INDEX_FORMAT_VERSION: u32 = 1;

/// Top-level `index.json` document
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IndexDocument {
    /// Format revision, readers reject newer revisions
    #[serde(rename = "formatVersion", default = "default_format_version")]
    pub format_version: u32,
    /// Display name of the repository
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Offered packages
    #[serde(default)]
    pub packages: Vec<PackageDefinition>,
}

fn default_format_version() -> u32 {
    INDEX_FORMAT_VERSION
}

impl IndexDocument {
    /// Create an index document for the given packages
    pub fn new(packages: Vec<PackageDefinition>) -> Self {
        Self {
            format_version: INDEX_FORMAT_VERSION,
            name: None,
            packages,
        }
    }
}
