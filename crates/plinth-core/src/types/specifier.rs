//! Version specifiers.
//!
//! A `VersionSpecifier` is a predicate over `SemanticVersion`. Each of
//! major/minor/patch may be left unconstrained, and a `MatchBehavior` flag
//! set selects between exact and compatible matching and how prerelease tags
//! are treated.
//!
//! Text grammar:
//!
//! ```text
//! ["^"] [major ["." minor ["." patch]]] ["-" prerelease] ["+" buildmetadata]
//! ```
//!
//! A leading `^` selects compatible matching. The literal `Any` (any case)
//! is the universal wildcard, and a bare identifier such as `beta` is a
//! prerelease-only compatible specifier.

use super::version::{
    compare_identifier, compare_identifier_lists, parse_component, validate_identifiers,
    SemanticVersion,
};
use crate::error::{PlinthError, PlinthResult};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::ops::BitOr;
use std::str::FromStr;

/// Flag set controlling how a specifier matches versions.
///
/// The empty set is exact matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MatchBehavior(u8);

impl MatchBehavior {
    pub const EXACT: MatchBehavior = MatchBehavior(0);
    pub const COMPATIBLE: MatchBehavior = MatchBehavior(1);
    pub const ANY_PRERELEASE: MatchBehavior = MatchBehavior(2);
    pub const MATCH_PRERELEASE: MatchBehavior = MatchBehavior(4);

    /// Check whether every flag in `other` is set
    pub fn contains(self, other: MatchBehavior) -> bool {
        self.0 & other.0 == other.0
    }

    /// Check whether compatible matching is selected
    pub fn is_compatible(self) -> bool {
        self.contains(Self::COMPATIBLE)
    }
}

impl BitOr for MatchBehavior {
    type Output = MatchBehavior;

    fn bitor(self, rhs: Self) -> Self::Output {
        MatchBehavior(self.0 | rhs.0)
    }
}

/// Version range predicate
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VersionSpecifier {
    major: Option<u64>,
    minor: Option<u64>,
    patch: Option<u64>,
    prerelease: Option<String>,
    build_metadata: Option<String>,
    behavior: MatchBehavior,
}

impl Default for VersionSpecifier {
    fn default() -> Self {
        Self::ANY
    }
}

impl VersionSpecifier {
    /// Universal wildcard, compatible with every version
    pub const ANY: VersionSpecifier = VersionSpecifier {
        major: None,
        minor: None,
        patch: None,
        prerelease: None,
        build_metadata: None,
        behavior: MatchBehavior(MatchBehavior::COMPATIBLE.0 | MatchBehavior::ANY_PRERELEASE.0),
    };

    /// Create a specifier, rejecting minor without major or patch without minor
    pub fn new(
        major: Option<u64>,
        minor: Option<u64>,
        patch: Option<u64>,
        prerelease: Option<String>,
        build_metadata: Option<String>,
        behavior: MatchBehavior,
    ) -> PlinthResult<Self> {
        let spec = Self {
            major,
            minor,
            patch,
            prerelease,
            build_metadata,
            behavior,
        };
        if (minor.is_some() && major.is_none()) || (patch.is_some() && minor.is_none()) {
            return Err(PlinthError::parse(
                format!("{:?}", spec),
                "minor requires major and patch requires minor",
            ));
        }
        Ok(spec)
    }

    /// Specifier matching exactly `version` (build metadata ignored)
    pub fn exact(version: &SemanticVersion) -> Self {
        Self {
            major: Some(version.major),
            minor: Some(version.minor),
            patch: Some(version.patch),
            prerelease: version.prerelease.clone(),
            build_metadata: None,
            behavior: MatchBehavior::EXACT,
        }
    }

    /// Specifier accepting `version` and compatible later versions
    pub fn compatible(version: &SemanticVersion) -> Self {
        Self {
            behavior: MatchBehavior::COMPATIBLE,
            ..Self::exact(version)
        }
    }

    /// Return a copy with the given behavior flags added
    pub fn with_behavior(mut self, flags: MatchBehavior) -> Self {
        self.behavior = self.behavior | flags;
        self
    }

    pub fn major(&self) -> Option<u64> {
        self.major
    }

    pub fn minor(&self) -> Option<u64> {
        self.minor
    }

    pub fn patch(&self) -> Option<u64> {
        self.patch
    }

    pub fn prerelease(&self) -> Option<&str> {
        self.prerelease.as_deref()
    }

    pub fn build_metadata(&self) -> Option<&str> {
        self.build_metadata.as_deref()
    }

    pub fn behavior(&self) -> MatchBehavior {
        self.behavior
    }

    /// Check if this is the universal wildcard
    pub fn is_any(&self) -> bool {
        *self == Self::ANY
    }

    /// Parse a specifier string
    pub fn parse(text: &str) -> PlinthResult<Self> {
        let input = text.trim();
        if input.is_empty() {
            return Err(PlinthError::parse(text, "empty version specifier"));
        }
        if input.eq_ignore_ascii_case("any") {
            return Ok(Self::ANY);
        }

        let (behavior, body) = match input.strip_prefix('^') {
            Some(rest) => (MatchBehavior::COMPATIBLE, rest),
            None => (MatchBehavior::EXACT, input),
        };
        if body.is_empty() {
            return Err(PlinthError::parse(input, "missing version after '^'"));
        }

        let (head, build_metadata) = match body.split_once('+') {
            Some((h, b)) => {
                validate_identifiers(input, b, "build metadata")?;
                (h, Some(b.to_string()))
            },
            None => (body, None),
        };

        let mut spec = Self {
            behavior,
            build_metadata,
            ..Self::ANY
        };

        if head.is_empty() {
            return Ok(spec);
        }

        // Bare identifier: prerelease-only, always compatible
        if head.starts_with(|c: char| c.is_ascii_alphabetic()) {
            validate_identifiers(input, head, "prerelease")?;
            spec.prerelease = Some(head.to_string());
            spec.behavior = MatchBehavior::COMPATIBLE;
            return Ok(spec);
        }

        let (core, prerelease) = match head.split_once('-') {
            Some((c, p)) => {
                validate_identifiers(input, p, "prerelease")?;
                (c, Some(p.to_string()))
            },
            None => (head, None),
        };
        spec.prerelease = prerelease;

        if core.is_empty() {
            return Ok(spec);
        }

        let parts: Vec<&str> = core.split('.').collect();
        if parts.len() > 3 {
            return Err(PlinthError::parse(
                input,
                "at most major.minor.patch may be given",
            ));
        }
        let mut numbers = parts.iter().map(|part| parse_component(input, part));
        spec.major = numbers.next().transpose()?;
        spec.minor = numbers.next().transpose()?;
        spec.patch = numbers.next().transpose()?;

        Ok(spec)
    }

    /// Check whether `version` satisfies this specifier
    pub fn is_compatible(&self, version: &SemanticVersion) -> bool {
        if self.is_any() {
            return true;
        }

        if self.behavior.is_compatible() {
            self.matches_compatible(version)
        } else {
            self.matches_exact(version)
        }
    }

    /// Check an optional version.
    ///
    /// An absent version satisfies the wildcard and any compatible
    /// specifier, but never an exact one.
    pub fn is_compatible_with(&self, version: Option<&SemanticVersion>) -> bool {
        match version {
            Some(version) => self.is_compatible(version),
            None => self.is_any() || self.behavior.is_compatible(),
        }
    }

    fn matches_exact(&self, version: &SemanticVersion) -> bool {
        let fields_match = self.major.map_or(true, |m| m == version.major)
            && self.minor.map_or(true, |m| m == version.minor)
            && self.patch.map_or(true, |p| p == version.patch);
        if !fields_match {
            return false;
        }

        let prerelease_match = if self.behavior.contains(MatchBehavior::ANY_PRERELEASE) {
            true
        } else if let (true, Some(own)) = (
            self.behavior.contains(MatchBehavior::MATCH_PRERELEASE),
            self.prerelease.as_deref(),
        ) {
            compare_prerelease(Some(own), version.prerelease.as_deref()) == Some(Ordering::Equal)
        } else {
            self.prerelease == version.prerelease
        };
        if !prerelease_match {
            return false;
        }

        match &self.build_metadata {
            Some(build) => version.build_metadata.as_deref() == Some(build.as_str()),
            None => true,
        }
    }

    fn matches_compatible(&self, version: &SemanticVersion) -> bool {
        if self.major.map_or(false, |m| m != version.major) {
            return false;
        }
        if self.minor.map_or(false, |m| m > version.minor) {
            return false;
        }
        if self.behavior.contains(MatchBehavior::ANY_PRERELEASE) {
            return true;
        }
        matches!(
            compare_prerelease(self.prerelease.as_deref(), version.prerelease.as_deref()),
            Some(Ordering::Less | Ordering::Equal)
        )
    }

    /// Render at most `field_count` of the leading numeric fields
    pub fn to_string_fields(&self, field_count: usize) -> String {
        if self.is_any() || self.is_unconstrained() {
            return "Any".to_string();
        }

        let mut out = String::new();
        let numbers: Vec<String> = [self.major, self.minor, self.patch]
            .iter()
            .map_while(|n| n.map(|n| n.to_string()))
            .take(field_count)
            .collect();

        let bare = self.behavior.is_compatible()
            && numbers.is_empty()
            && self
                .prerelease
                .as_deref()
                .map_or(false, |p| {
                    p.starts_with(|c: char| c.is_ascii_alphabetic()) && !p.eq_ignore_ascii_case("any")
                });

        if bare {
            out.push_str(self.prerelease.as_deref().unwrap_or_default());
        } else {
            if self.behavior.is_compatible() {
                out.push('^');
            }
            out.push_str(&numbers.join("."));
            if let Some(pre) = &self.prerelease {
                out.push('-');
                out.push_str(pre);
            }
        }
        if let Some(build) = &self.build_metadata {
            out.push('+');
            out.push_str(build);
        }
        out
    }

    fn is_unconstrained(&self) -> bool {
        self.major.is_none()
            && self.prerelease.is_none()
            && self.build_metadata.is_none()
    }
}

/// Compare two optional prerelease tags.
///
/// A release (no tag) sorts above any prerelease. Returns `None` when the
/// tags belong to different named tracks, e.g. `alpha.1` and `beta.1`;
/// callers treat that as a failed match.
pub fn compare_prerelease(a: Option<&str>, b: Option<&str>) -> Option<Ordering> {
    match (a, b) {
        (None, None) => Some(Ordering::Equal),
        (Some(_), None) => Some(Ordering::Less),
        (None, Some(_)) => Some(Ordering::Greater),
        (Some(a), Some(b)) => {
            let lead_a = a.split('.').next().unwrap_or_default();
            let lead_b = b.split('.').next().unwrap_or_default();
            let both_named = lead_a.parse::<u64>().is_err() && lead_b.parse::<u64>().is_err();
            if both_named && compare_identifier(lead_a, lead_b) != Ordering::Equal {
                return None;
            }
            Some(compare_identifier_lists(a, b))
        },
    }
}

impl FromStr for VersionSpecifier {
    type Err = PlinthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for VersionSpecifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_string_fields(3))
    }
}

impl Serialize for VersionSpecifier {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for VersionSpecifier {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::parse(&text).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(text: &str) -> SemanticVersion {
        text.parse().unwrap()
    }

    fn spec(text: &str) -> VersionSpecifier {
        VersionSpecifier::parse(text).unwrap()
    }

    #[test]
    fn test_parse_fields() {
        let s = spec("^1.2");
        assert_eq!(s.major(), Some(1));
        assert_eq!(s.minor(), Some(2));
        assert_eq!(s.patch(), None);
        assert!(s.behavior().is_compatible());

        let s = spec("1.2.3-rc.1+linux");
        assert_eq!(s.patch(), Some(3));
        assert_eq!(s.prerelease(), Some("rc.1"));
        assert_eq!(s.build_metadata(), Some("linux"));
        assert_eq!(s.behavior(), MatchBehavior::EXACT);
    }

    #[test]
    fn test_parse_any_case_insensitive() {
        assert!(spec("Any").is_any());
        assert!(spec("ANY").is_any());
        assert!(spec(" any ").is_any());
        assert_eq!(VersionSpecifier::ANY.to_string(), "Any");
    }

    #[test]
    fn test_parse_bare_prerelease() {
        let s = spec("beta");
        assert_eq!(s.major(), None);
        assert_eq!(s.prerelease(), Some("beta"));
        assert!(s.behavior().is_compatible());
        assert_eq!(s.to_string(), "beta");
    }

    #[test]
    fn test_parse_errors() {
        for bad in ["", "^", "-", "1.", ".1", "1..2", "1.2.3.4", "1.x", "1.2.3-", "1+", "^^1"] {
            assert!(
                matches!(VersionSpecifier::parse(bad), Err(PlinthError::Parse { .. })),
                "{:?} should fail",
                bad
            );
        }
    }

    #[test]
    fn test_new_enforces_field_order() {
        assert!(VersionSpecifier::new(None, Some(1), None, None, None, MatchBehavior::EXACT).is_err());
        assert!(
            VersionSpecifier::new(Some(1), None, Some(2), None, None, MatchBehavior::EXACT).is_err()
        );
        assert!(
            VersionSpecifier::new(Some(1), Some(0), None, None, None, MatchBehavior::EXACT).is_ok()
        );
    }

    #[test]
    fn test_display_truncates_fields() {
        let s = spec("^1.2.3-rc.1");
        assert_eq!(s.to_string(), "^1.2.3-rc.1");
        assert_eq!(s.to_string_fields(2), "^1.2-rc.1");
        assert_eq!(s.to_string_fields(1), "^1-rc.1");
        assert_eq!(spec("-alpha").to_string(), "-alpha");
    }

    #[test]
    fn test_any_matches_everything() {
        assert!(VersionSpecifier::ANY.is_compatible(&v("0.0.1-alpha+x")));
        assert!(VersionSpecifier::ANY.is_compatible(&v("99.1.0")));
        assert!(VersionSpecifier::ANY.is_compatible_with(None));
    }

    #[test]
    fn test_exact_matching() {
        let s = spec("1.2");
        assert!(s.is_compatible(&v("1.2.0")));
        assert!(s.is_compatible(&v("1.2.9")));
        assert!(!s.is_compatible(&v("1.3.0")));
        assert!(!s.is_compatible(&v("1.2.0-beta")));
        assert!(!s.is_compatible_with(None));

        let s = spec("1.2.0-beta");
        assert!(s.is_compatible(&v("1.2.0-beta")));
        assert!(!s.is_compatible(&v("1.2.0-beta.2")));
        assert!(!s.is_compatible(&v("1.2.0")));
    }

    #[test]
    fn test_exact_build_metadata() {
        let s = spec("1.0.0+win");
        assert!(s.is_compatible(&v("1.0.0+win")));
        assert!(!s.is_compatible(&v("1.0.0+linux")));
        assert!(!s.is_compatible(&v("1.0.0")));
        assert!(spec("1.0.0").is_compatible(&v("1.0.0+linux")));
    }

    #[test]
    fn test_exact_prerelease_flags() {
        let any_pre = spec("1.2.0").with_behavior(MatchBehavior::ANY_PRERELEASE);
        assert!(any_pre.is_compatible(&v("1.2.0-nightly.5")));

        let match_pre = spec("1.2.0-beta").with_behavior(MatchBehavior::MATCH_PRERELEASE);
        assert!(match_pre.is_compatible(&v("1.2.0-beta")));
        assert!(!match_pre.is_compatible(&v("1.2.0-beta.4")));
        assert!(!match_pre.is_compatible(&v("1.2.0-alpha.4")));

        let match_build = spec("1.2.0-beta.4").with_behavior(MatchBehavior::MATCH_PRERELEASE);
        assert!(match_build.is_compatible(&v("1.2.0-beta.4")));
        assert!(!match_build.is_compatible(&v("1.2.0-beta.5")));
        assert!(!match_build.is_compatible(&v("1.2.0-beta")));
        assert!(!match_pre.is_compatible(&v("1.2.0")));
    }

    #[test]
    fn test_compatible_matching() {
        let s = spec("^1.2");
        assert!(s.is_compatible(&v("1.2.0")));
        assert!(s.is_compatible(&v("1.2.7")));
        assert!(s.is_compatible(&v("1.9.0")));
        assert!(!s.is_compatible(&v("1.1.9")));
        assert!(!s.is_compatible(&v("2.0.0")));
        assert!(!s.is_compatible(&v("1.3.0-beta")));
        assert!(s.is_compatible_with(None));

        // patch is never checked
        assert!(spec("^1.2.5").is_compatible(&v("1.2.0")));
    }

    #[test]
    fn test_compatible_prerelease() {
        let s = spec("^2.0-beta.2");
        assert!(s.is_compatible(&v("2.0.0-beta.2")));
        assert!(s.is_compatible(&v("2.0.0-beta.10")));
        assert!(s.is_compatible(&v("2.1.0")));
        assert!(!s.is_compatible(&v("2.0.0-beta.1")));
        assert!(!s.is_compatible(&v("2.0.0-alpha.9")));

        let s = spec("^2.0").with_behavior(MatchBehavior::ANY_PRERELEASE);
        assert!(s.is_compatible(&v("2.4.0-alpha")));
    }

    #[test]
    fn test_compare_prerelease() {
        assert_eq!(compare_prerelease(None, None), Some(Ordering::Equal));
        assert_eq!(compare_prerelease(Some("rc"), None), Some(Ordering::Less));
        assert_eq!(compare_prerelease(None, Some("rc")), Some(Ordering::Greater));
        assert_eq!(
            compare_prerelease(Some("beta.2"), Some("beta.11")),
            Some(Ordering::Less)
        );
        assert_eq!(compare_prerelease(Some("1"), Some("beta")), Some(Ordering::Less));
        assert_eq!(compare_prerelease(Some("alpha"), Some("beta")), None);
    }

    #[test]
    fn test_serde_as_string() {
        let s = spec("^1.4");
        let json = serde_json::to_string(&s).unwrap();
        assert_eq!(json, "\"^1.4\"");
        let back: VersionSpecifier = serde_json::from_str(&json).unwrap();
        assert_eq!(back, s);
        assert!(serde_json::from_str::<VersionSpecifier>("\"1..0\"").is_err());
    }
}
