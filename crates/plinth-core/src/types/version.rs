//! Semantic versions.
//!
//! Provides the `SemanticVersion` value type (major.minor.patch-prerelease+build)
//! with semver precedence ordering and string serialization.

use crate::error::{PlinthError, PlinthResult};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Semantic version (major.minor.patch-prerelease+build)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SemanticVersion {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub prerelease: Option<String>,
    pub build_metadata: Option<String>,
}

impl SemanticVersion {
    /// Create a new release version
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            prerelease: None,
            build_metadata: None,
        }
    }

    /// Attach a prerelease tag
    pub fn with_prerelease(mut self, prerelease: impl Into<String>) -> Self {
        self.prerelease = Some(prerelease.into());
        self
    }

    /// Attach build metadata
    pub fn with_build_metadata(mut self, build: impl Into<String>) -> Self {
        self.build_metadata = Some(build.into());
        self
    }

    /// Check if this is a prerelease version
    pub fn is_prerelease(&self) -> bool {
        self.prerelease.is_some()
    }

    /// Compare by semver precedence (ignores build metadata)
    pub fn precedence_cmp(&self, other: &Self) -> Ordering {
        match (self.major, self.minor, self.patch).cmp(&(other.major, other.minor, other.patch)) {
            Ordering::Equal => match (&self.prerelease, &other.prerelease) {
                (None, None) => Ordering::Equal,
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (Some(a), Some(b)) => compare_identifier_lists(a, b),
            },
            other => other,
        }
    }
}

/// Compare two dot-separated prerelease strings by semver rules.
///
/// Numeric identifiers compare numerically and sort below textual ones,
/// textual identifiers compare lexically, and a shorter list that is a
/// prefix of the other sorts first.
pub(crate) fn compare_identifier_lists(a: &str, b: &str) -> Ordering {
    let mut left = a.split('.');
    let mut right = b.split('.');
    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => match compare_identifier(x, y) {
                Ordering::Equal => continue,
                other => return other,
            },
        }
    }
}

pub(crate) fn compare_identifier(a: &str, b: &str) -> Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

/// Validate a dot-separated identifier list (prerelease or build metadata)
pub(crate) fn validate_identifiers(input: &str, value: &str, what: &str) -> PlinthResult<()> {
    let valid = value.split('.').all(|ident| {
        !ident.is_empty()
            && ident
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-')
    });
    if valid {
        Ok(())
    } else {
        Err(PlinthError::parse(input, format!("invalid {} '{}'", what, value)))
    }
}

/// Parse one numeric version component
pub(crate) fn parse_component(input: &str, component: &str) -> PlinthResult<u64> {
    if component.is_empty() || !component.chars().all(|c| c.is_ascii_digit()) {
        return Err(PlinthError::parse(
            input,
            format!("invalid number '{}'", component),
        ));
    }
    component
        .parse()
        .map_err(|_| PlinthError::parse(input, format!("number '{}' is too large", component)))
}

impl FromStr for SemanticVersion {
    type Err = PlinthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let input = s.trim();

        // Split on '+' for build metadata
        let (version_part, build_metadata) = match input.split_once('+') {
            Some((v, b)) => {
                validate_identifiers(input, b, "build metadata")?;
                (v, Some(b.to_string()))
            },
            None => (input, None),
        };

        // Split on '-' for prerelease
        let (core_part, prerelease) = match version_part.split_once('-') {
            Some((c, p)) => {
                validate_identifiers(input, p, "prerelease")?;
                (c, Some(p.to_string()))
            },
            None => (version_part, None),
        };

        let parts: Vec<&str> = core_part.split('.').collect();
        if parts.len() != 3 {
            return Err(PlinthError::parse(
                input,
                "expected major.minor.patch",
            ));
        }

        Ok(SemanticVersion {
            major: parse_component(input, parts[0])?,
            minor: parse_component(input, parts[1])?,
            patch: parse_component(input, parts[2])?,
            prerelease,
            build_metadata,
        })
    }
}

impl fmt::Display for SemanticVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;

        if let Some(ref pre) = self.prerelease {
            write!(f, "-{}", pre)?;
        }

        if let Some(ref build) = self.build_metadata {
            write!(f, "+{}", build)?;
        }

        Ok(())
    }
}

impl PartialOrd for SemanticVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SemanticVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        // Build metadata only breaks ties so that Ord agrees with Eq.
        self.precedence_cmp(other)
            .then_with(|| self.build_metadata.cmp(&other.build_metadata))
    }
}

impl Serialize for SemanticVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SemanticVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}
