//! Install target
//!
//! A directory packages are installed into. The installed-package database
//! lives in `<root>/.plinth/installed/<name>.json`, one record per package,
//! each a serialized `PackageDefinition` listing the files it owns.

use plinth_core::error::PlinthError;
use plinth_core::utils::{file_key, safe_join};
use plinth_core::{OwnedFile, PackageDefinition};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::tarball::extract_package;
use crate::CacheResult;

const STATE_DIR: &str = ".plinth";
const INSTALLED_DIR: &str = "installed";
const LOCK_FILE: &str = "install.lock";

/// A directory with an installed-package database
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallTarget {
    root: PathBuf,
}

impl InstallTarget {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding one record per installed package
    pub fn database_dir(&self) -> PathBuf {
        self.root.join(STATE_DIR).join(INSTALLED_DIR)
    }

    /// Path of the exclusive install lock
    pub fn lock_path(&self) -> PathBuf {
        self.root.join(STATE_DIR).join(LOCK_FILE)
    }

    fn record_path(&self, name: &str) -> PathBuf {
        let file_name: String = name
            .chars()
            .map(|c| if c == '/' || c == '\\' || c == ':' { '_' } else { c })
            .collect();
        self.database_dir().join(format!("{}.json", file_name))
    }

    /// Every installed package keyed by name
    pub fn installed(&self) -> CacheResult<HashMap<String, PackageDefinition>> {
        let dir = self.database_dir();
        let mut installed = HashMap::new();
        if !dir.exists() {
            return Ok(installed);
        }

        let entries = fs::read_dir(&dir)
            .map_err(|e| PlinthError::io(format!("Failed to read {}", dir.display()), e))?;
        for entry in entries {
            let path = entry
                .map_err(|e| PlinthError::io(format!("Failed to read {}", dir.display()), e))?
                .path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            let definition = read_record(&path)?;
            installed.insert(definition.name().to_string(), definition);
        }
        Ok(installed)
    }

    /// The installed record for `name`, if any
    pub fn get(&self, name: &str) -> CacheResult<Option<PackageDefinition>> {
        let path = self.record_path(name);
        if !path.exists() {
            return Ok(None);
        }
        read_record(&path).map(Some)
    }

    /// Extract `archive` into the target and record `definition` as installed.
    ///
    /// When the definition declares no files, the extracted payload becomes
    /// its owned file list. Returns the recorded definition.
    pub fn install(&self, definition: &PackageDefinition, archive: &Path) -> CacheResult<PackageDefinition> {
        let file = fs::File::open(archive)
            .map_err(|e| PlinthError::io(format!("Failed to open {}", archive.display()), e))?;
        let extracted = extract_package(file, &self.root)?;

        let mut record = definition.clone();
        if record.files.is_empty() {
            record.files = extracted
                .iter()
                .map(|path| OwnedFile::new(file_key(&path.to_string_lossy())))
                .collect();
        }
        self.write_record(&record)?;

        info!(package = %record.identity, files = extracted.len(), "installed package");
        Ok(record)
    }

    /// Remove the files `definition` owns and drop its record.
    ///
    /// Files also declared by another installed package are left in place.
    pub fn uninstall(&self, definition: &PackageDefinition) -> CacheResult<()> {
        let record = self
            .get(definition.name())?
            .unwrap_or_else(|| definition.clone());

        let shared: HashSet<String> = self
            .installed()?
            .values()
            .filter(|other| other.name() != record.name())
            .flat_map(|other| other.files.iter().map(|file| file_key(&file.path)))
            .collect();

        for file in &record.files {
            if shared.contains(&file_key(&file.path)) {
                debug!(path = %file.path, "keeping file shared with another package");
                continue;
            }
            let path = safe_join(&self.root, Path::new(&file.path))?;
            if path.is_file() {
                fs::remove_file(&path)
                    .map_err(|e| PlinthError::io(format!("Failed to remove {}", path.display()), e))?;
            }
            self.prune_empty_parents(&path);
        }

        let record_path = self.record_path(record.name());
        if record_path.exists() {
            fs::remove_file(&record_path)
                .map_err(|e| PlinthError::io(format!("Failed to remove {}", record_path.display()), e))?;
        }

        info!(package = %record.identity, "uninstalled package");
        Ok(())
    }

    fn write_record(&self, record: &PackageDefinition) -> CacheResult<()> {
        let dir = self.database_dir();
        fs::create_dir_all(&dir)
            .map_err(|e| PlinthError::io(format!("Failed to create {}", dir.display()), e))?;

        let content = serde_json::to_string_pretty(record).map_err(|e| {
            PlinthError::io(
                format!("Failed to serialize record for {}", record.identity),
                std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()),
            )
        })?;
        let path = self.record_path(record.name());
        fs::write(&path, content)
            .map_err(|e| PlinthError::io(format!("Failed to write {}", path.display()), e))
    }

    /// Remove empty directories between `path` and the target root
    fn prune_empty_parents(&self, path: &Path) {
        let mut current = path.parent();
        while let Some(dir) = current {
            if dir == self.root || !dir.starts_with(&self.root) {
                break;
            }
            // remove_dir only succeeds on empty directories
            if fs::remove_dir(dir).is_err() {
                break;
            }
            current = dir.parent();
        }
    }
}

fn read_record(path: &Path) -> CacheResult<PackageDefinition> {
    let content = fs::read_to_string(path)
        .map_err(|e| PlinthError::io(format!("Failed to read {}", path.display()), e))?;
    serde_json::from_str(&content).map_err(|e| {
        PlinthError::io(
            format!("Corrupt install record {}", path.display()),
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()),
        )
    })
}
