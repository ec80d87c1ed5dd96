//! plinth.toml configuration parsing and serialization

use std::ops::Range;
use std::path::PathBuf;
use std::time::Duration;

use plinth_core::error::PlinthError;
use plinth_core::{Architecture, MissingDependencyPolicy};
use serde::{Deserialize, Serialize};

use crate::ConfigResult;

/// Complete plinth.toml configuration
///
/// Every setting is optional so that layers can be merged field by field.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PlinthToml {
    /// Install settings
    #[serde(default)]
    pub settings: Settings,

    /// Repositories in priority order, `[[repository]]` tables
    #[serde(default, rename = "repository", skip_serializing_if = "Vec::is_empty")]
    pub repositories: Vec<RepositoryEntry>,
}

/// `[settings]` section
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Settings {
    /// Directory packages are installed into
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<PathBuf>,

    /// Operating system to select package variants for
    #[serde(skip_serializing_if = "Option::is_none")]
    pub os: Option<String>,

    /// Architecture to select package variants for
    #[serde(skip_serializing_if = "Option::is_none")]
    pub architecture: Option<Architecture>,

    /// Whole-operation timeout in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,

    /// Whether to ask before overwriting files
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interactive: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub missing_dependencies: Option<MissingDependencyPolicy>,

    /// Artifact cache location, caching is off when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,
}

impl Settings {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout.map(Duration::from_secs)
    }

    /// Fill every unset field from `base`
    pub fn fill_from(&mut self, base: Settings) {
        self.target = self.target.take().or(base.target);
        self.os = self.os.take().or(base.os);
        self.architecture = self.architecture.or(base.architecture);
        self.timeout = self.timeout.or(base.timeout);
        self.interactive = self.interactive.or(base.interactive);
        self.missing_dependencies = self.missing_dependencies.or(base.missing_dependencies);
        self.cache_dir = self.cache_dir.take().or(base.cache_dir);
    }
}

/// One `[[repository]]` entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryEntry {
    /// Location: an http(s) URL, a `file://` URL or a directory path
    pub url: String,

    /// Display name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl RepositoryEntry {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            name: None,
        }
    }
}

/// Parse TOML string to PlinthToml configuration
pub fn parse_plinth_toml(content: &str) -> ConfigResult<PlinthToml> {
    // First try with toml_edit for better error reporting
    content
        .parse::<toml_edit::DocumentMut>()
        .map_err(|e| located_error(content, e.message(), e.span()))?;

    // Then parse with serde for type safety
    let config: PlinthToml =
        toml::from_str(content).map_err(|e| located_error(content, e.message(), e.span()))?;

    validate_config(&config)?;

    Ok(config)
}

/// Serialize PlinthToml to TOML string
pub fn serialize_plinth_toml(config: &PlinthToml) -> ConfigResult<String> {
    toml::to_string_pretty(config).map_err(|e| PlinthError::TomlParse {
        message: format!("serialization failed: {}", e),
        line: 0,
        column: 0,
    })
}

/// Validate configuration completeness
pub fn validate_config(config: &PlinthToml) -> ConfigResult<()> {
    for (position, repository) in config.repositories.iter().enumerate() {
        if repository.url.trim().is_empty() {
            return Err(PlinthError::ConfigValidation {
                field: format!("repository[{}].url", position),
                reason: "repository url must not be empty".to_string(),
            });
        }
    }

    if config.settings.timeout == Some(0) {
        return Err(PlinthError::ConfigValidation {
            field: "settings.timeout".to_string(),
            reason: "timeout must be at least one second".to_string(),
        });
    }

    if let Some(os) = &config.settings.os {
        if os.trim().is_empty() {
            return Err(PlinthError::ConfigValidation {
                field: "settings.os".to_string(),
                reason: "os must not be empty".to_string(),
            });
        }
    }

    Ok(())
}

/// Load and parse plinth.toml from file path
pub async fn load_from_file(path: &camino::Utf8Path) -> ConfigResult<PlinthToml> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| PlinthError::io(format!("Failed to read {}", path), e))?;

    parse_plinth_toml(&content).map_err(|e| match e {
        PlinthError::TomlParse {
            message,
            line,
            column,
        } => PlinthError::TomlParse {
            message: format!("in {}: {}", path, message),
            line,
            column,
        },
        PlinthError::ConfigValidation { field, reason } => PlinthError::ConfigValidation {
            field,
            reason: format!("in {}: {}", path, reason),
        },
        other => other,
    })
}

fn located_error(content: &str, message: &str, span: Option<Range<usize>>) -> PlinthError {
    let (line, column) = span
        .map(|span| line_and_column(content, span.start))
        .unwrap_or((0, 0));
    PlinthError::TomlParse {
        message: message.trim().to_string(),
        line,
        column,
    }
}

/// One-based line and column of a byte offset
fn line_and_column(content: &str, offset: usize) -> (usize, usize) {
    let offset = offset.min(content.len());
    let before = content.get(..offset).unwrap_or(content);
    let line = before.matches('\n').count() + 1;
    let column = before
        .rfind('\n')
        .map_or(before.chars().count(), |newline| before[newline + 1..].chars().count())
        + 1;
    (line, column)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_empty_config() {
        let config = parse_plinth_toml("").unwrap();
        assert_eq!(config, PlinthToml::default());
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
[settings]
target = "/opt/app/plugins"
os = "Linux"
architecture = "x64"
timeout = 300
interactive = false
missing-dependencies = "ask"
cache-dir = "/var/cache/plinth"

[[repository]]
url = "https://plugins.example.com/stable"
name = "stable"

[[repository]]
url = "/srv/local-plugins"
"#;

        let config = parse_plinth_toml(toml).unwrap();
        let settings = &config.settings;
        assert_eq!(settings.target, Some(PathBuf::from("/opt/app/plugins")));
        assert_eq!(settings.os.as_deref(), Some("Linux"));
        assert_eq!(settings.architecture, Some(Architecture::X64));
        assert_eq!(settings.timeout(), Some(Duration::from_secs(300)));
        assert_eq!(settings.interactive, Some(false));
        assert_eq!(settings.missing_dependencies, Some(MissingDependencyPolicy::Ask));
        assert_eq!(config.repositories.len(), 2);
        assert_eq!(config.repositories[0].name.as_deref(), Some("stable"));
        assert!(config.repositories[1].name.is_none());
    }

    #[test]
    fn test_syntax_error_has_location() {
        let toml = "[settings]\nos = \"Linux\"\ntimeout = = 3\n";

        match parse_plinth_toml(toml).unwrap_err() {
            PlinthError::TomlParse { line, column, .. } => {
                assert_eq!(line, 3);
                assert!(column > 1);
            },
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_type_error_has_location() {
        let toml = "[settings]\ntimeout = \"soon\"\n";
        assert!(matches!(
            parse_plinth_toml(toml).unwrap_err(),
            PlinthError::TomlParse { line: 2, .. }
        ));
    }

    #[test]
    fn test_unknown_architecture() {
        let toml = "[settings]\narchitecture = \"sparc\"\n";
        assert!(parse_plinth_toml(toml).is_err());
    }

    #[test]
    fn test_validation() {
        let err = parse_plinth_toml("[[repository]]\nurl = \"  \"\n").unwrap_err();
        assert!(matches!(err, PlinthError::ConfigValidation { ref field, .. } if field == "repository[0].url"));

        let err = parse_plinth_toml("[settings]\ntimeout = 0\n").unwrap_err();
        assert!(matches!(err, PlinthError::ConfigValidation { .. }));
    }

    #[test]
    fn test_round_trip_serialization() {
        let toml = r#"
[settings]
architecture = "arm64"
missing-dependencies = "skip"

[[repository]]
url = "https://plugins.example.com"
"#;

        let config = parse_plinth_toml(toml).unwrap();
        let serialized = serialize_plinth_toml(&config).unwrap();
        let reparsed = parse_plinth_toml(&serialized).unwrap();

        assert_eq!(config, reparsed);
    }

    #[test]
    fn test_fill_from() {
        let mut project = Settings {
            os: Some("Windows".to_string()),
            ..Settings::default()
        };
        let global = Settings {
            os: Some("Linux".to_string()),
            timeout: Some(60),
            ..Settings::default()
        };
        project.fill_from(global);
        assert_eq!(project.os.as_deref(), Some("Windows"));
        assert_eq!(project.timeout, Some(60));
    }

    #[test]
    fn test_line_and_column() {
        assert_eq!(line_and_column("abc", 0), (1, 1));
        assert_eq!(line_and_column("ab\ncd", 4), (2, 2));
    }
}
