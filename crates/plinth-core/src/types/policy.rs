//! Install-time policy settings shared by configuration and the installer.

use crate::error::PlinthError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// What to do with dependencies that are not installed yet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingDependencyPolicy {
    /// Install them alongside the requested packages
    #[default]
    Include,
    /// Ask once per package
    Ask,
    /// Install only what was requested
    Skip,
}

impl FromStr for MissingDependencyPolicy {
    type Err = PlinthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "include" => Ok(Self::Include),
            "ask" => Ok(Self::Ask),
            "skip" => Ok(Self::Skip),
            _ => Err(PlinthError::ConfigValidation {
                field: "missing-dependencies".to_string(),
                reason: format!("expected include, ask or skip, got '{}'", s),
            }),
        }
    }
}

impl fmt::Display for MissingDependencyPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Include => "include",
            Self::Ask => "ask",
            Self::Skip => "skip",
        })
    }
}
