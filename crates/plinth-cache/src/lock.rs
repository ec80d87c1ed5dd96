//! Exclusive install lock
//!
//! Held by whoever is changing an install target, from the first download
//! until the last package is installed. The lock is an advisory `flock` on
//! `<target>/.plinth/install.lock` and is released when the guard drops.

use fs2::FileExt;
use plinth_core::error::PlinthError;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::CacheResult;

/// RAII guard for the install lock
#[derive(Debug)]
pub struct InstallLock {
    file: File,
    path: PathBuf,
}

fn open_lock_file(path: &Path) -> CacheResult<File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| PlinthError::io(format!("Failed to create {}", parent.display()), e))?;
    }
    OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(false)
        .open(path)
        .map_err(|e| PlinthError::io(format!("Failed to open lock file {}", path.display()), e))
}

impl InstallLock {
    /// Acquire the lock, blocking until it is available
    pub fn acquire<P: AsRef<Path>>(path: P) -> CacheResult<Self> {
        let path = path.as_ref().to_path_buf();
        let file = open_lock_file(&path)?;

        file.lock_exclusive()
            .map_err(|e| PlinthError::io("Failed to acquire install lock".to_string(), e))?;

        info!(path = %path.display(), "acquired install lock");
        Ok(Self { file, path })
    }

    /// Try to acquire the lock without blocking.
    ///
    /// Returns `Ok(None)` when another holder has it.
    pub fn try_acquire<P: AsRef<Path>>(path: P) -> CacheResult<Option<Self>> {
        let path = path.as_ref().to_path_buf();
        let file = open_lock_file(&path)?;

        match file.try_lock_exclusive() {
            Ok(()) => {
                info!(path = %path.display(), "acquired install lock");
                Ok(Some(Self { file, path }))
            },
            Err(e) if e.kind() == fs2::lock_contended_error().kind() => {
                debug!(path = %path.display(), "install lock already held");
                Ok(None)
            },
            Err(e) => Err(PlinthError::io("Failed to try-acquire install lock".to_string(), e)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for InstallLock {
    fn drop(&mut self) {
        if let Err(e) = self.file.unlock() {
            debug!(path = %self.path.display(), error = %e, "failed to release install lock");
        } else {
            debug!(path = %self.path.display(), "released install lock");
        }
    }
}
