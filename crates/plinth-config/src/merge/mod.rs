//! Configuration layering, fallback logic, and environment overrides

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use camino::{Utf8Path, Utf8PathBuf};
use plinth_core::error::PlinthError;
use tracing::debug;

use crate::toml::{PlinthToml, RepositoryEntry, Settings};
use crate::ConfigResult;

/// Project configuration file name
pub const CONFIG_FILE_NAME: &str = "plinth.toml";

/// Prefix of recognised environment variables
pub const ENV_PREFIX: &str = "PLINTH_";

/// Main configuration loading interface
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Current working directory
    cwd: Utf8PathBuf,
}

/// Configuration layering and merging
#[derive(Debug, Default)]
pub struct ConfigLayering;

/// Configuration source tracking
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigSource {
    /// Global config file
    Global(Utf8PathBuf),
    /// Project plinth.toml file
    Project(Utf8PathBuf),
    /// Environment variable
    Environment(String),
    /// CLI flag
    CommandLine,
}

impl ConfigLoader {
    pub fn new(cwd: Utf8PathBuf) -> Self {
        Self { cwd }
    }

    /// Load the nearest project configuration, if there is one
    pub async fn load_project_config(&self) -> ConfigResult<Option<(PlinthToml, ConfigSource)>> {
        match self.resolve_config_path(CONFIG_FILE_NAME) {
            Some(path) => {
                let config = crate::toml::load_from_file(&path).await?;
                debug!(path = %path, "loaded project configuration");
                Ok(Some((config, ConfigSource::Project(path))))
            },
            None => Ok(None),
        }
    }

    /// Find a configuration file, walking up from the working directory
    pub fn resolve_config_path(&self, filename: &str) -> Option<Utf8PathBuf> {
        self.cwd
            .ancestors()
            .map(|dir| dir.join(filename))
            .find(|candidate| candidate.is_file())
    }

    /// Location of the per-user configuration file
    pub fn global_config_path() -> ConfigResult<Utf8PathBuf> {
        let home_dir = dirs::home_dir().ok_or_else(|| PlinthError::ConfigValidation {
            field: "home_dir".to_string(),
            reason: "Could not determine home directory".to_string(),
        })?;

        Ok(Utf8PathBuf::try_from(home_dir)
            .map_err(|e| PlinthError::ConfigValidation {
                field: "home_dir".to_string(),
                reason: format!("Invalid home directory path: {}", e),
            })?
            .join(".plinth")
            .join("config.toml"))
    }

    /// Load global configuration
    pub async fn load_global_config(&self) -> ConfigResult<Option<PlinthToml>> {
        Self::load_optional(&Self::global_config_path()?).await
    }

    /// Load a configuration file if it exists
    pub async fn load_optional(path: &Utf8Path) -> ConfigResult<Option<PlinthToml>> {
        if path.is_file() {
            let config = crate::toml::load_from_file(path).await?;
            debug!(path = %path, "loaded configuration");
            Ok(Some(config))
        } else {
            Ok(None)
        }
    }
}

impl ConfigLayering {
    pub fn new() -> Self {
        Self
    }

    /// Merge configuration layers, later layers win.
    ///
    /// Settings are overridden field by field. Repositories of later layers
    /// are placed in front of earlier ones, keeping the first occurrence of
    /// each url.
    pub fn merge_configs(
        global_config: Option<PlinthToml>,
        project_config: Option<PlinthToml>,
        env_overrides: HashMap<String, String>,
        cli_overrides: PlinthToml,
    ) -> ConfigResult<PlinthToml> {
        let mut merged = project_config.unwrap_or_default();

        if let Some(global) = global_config {
            merged.settings.fill_from(global.settings);
            merged.repositories.extend(global.repositories);
        }

        let env = Self::env_layer(&env_overrides)?;
        let mut merged = Self::overlay(merged, env);
        merged = Self::overlay(merged, cli_overrides);

        let mut seen = HashSet::new();
        merged
            .repositories
            .retain(|repository| seen.insert(repository.url.clone()));

        crate::toml::validate_config(&merged)?;
        Ok(merged)
    }

    /// Put `top` over `base`
    fn overlay(base: PlinthToml, mut top: PlinthToml) -> PlinthToml {
        top.settings.fill_from(base.settings);
        top.repositories.extend(base.repositories);
        top
    }

    /// Translate `PLINTH_*` variables into a configuration layer
    fn env_layer(overrides: &HashMap<String, String>) -> ConfigResult<PlinthToml> {
        let mut layer = PlinthToml::default();
        let settings: &mut Settings = &mut layer.settings;

        for (key, value) in overrides {
            match key.as_str() {
                "PLINTH_OS" => settings.os = Some(value.clone()),
                "PLINTH_ARCHITECTURE" => settings.architecture = Some(value.parse().map_err(|e: PlinthError| env_error(key, e))?),
                "PLINTH_TIMEOUT" => {
                    let seconds = value.trim().parse::<u64>().map_err(|e| PlinthError::ConfigValidation {
                        field: key.clone(),
                        reason: format!("expected a number of seconds: {}", e),
                    })?;
                    settings.timeout = Some(seconds);
                },
                "PLINTH_TARGET" => settings.target = Some(PathBuf::from(value)),
                "PLINTH_CACHE_DIR" => settings.cache_dir = Some(PathBuf::from(value)),
                "PLINTH_MISSING_DEPENDENCIES" => {
                    settings.missing_dependencies = Some(value.parse().map_err(|e: PlinthError| env_error(key, e))?)
                },
                "PLINTH_REPOSITORIES" => {
                    layer.repositories = value
                        .split(',')
                        .map(str::trim)
                        .filter(|url| !url.is_empty())
                        .map(RepositoryEntry::new)
                        .collect();
                },
                _ => debug!(variable = %key, "ignoring unknown environment variable"),
            }
        }

        Ok(layer)
    }

    /// Collect environment variable overrides
    pub fn collect_env_overrides() -> HashMap<String, String> {
        std::env::vars()
            .filter(|(key, _)| key.starts_with(ENV_PREFIX))
            .collect()
    }
}

fn env_error(variable: &str, error: PlinthError) -> PlinthError {
    PlinthError::ConfigValidation {
        field: variable.to_string(),
        reason: error.to_string(),
    }
}
