//! Path utilities for safe file system operations.
//!
//! Provides path normalization, security checks to prevent directory
//! traversal, and the normalized key used to compare owned file paths.

use crate::error::{PlinthError, PlinthResult};
use std::path::{Component, Path, PathBuf};

/// Normalize a path by resolving . and .. components
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut components = Vec::new();

    for component in path.components() {
        match component {
            Component::CurDir => {},
            Component::ParentDir => {
                // Keep a leading '..' so escapes stay visible
                if components.is_empty() {
                    components.push(component);
                } else {
                    components.pop();
                }
            },
            other => {
                components.push(other);
            },
        }
    }

    components.iter().collect()
}

/// Check if a path is safe (no directory traversal)
pub fn is_safe_path(path: &Path) -> bool {
    if path.is_absolute() {
        return false;
    }

    let mut depth = 0i32;

    for component in path.components() {
        match component {
            Component::CurDir => {},
            Component::ParentDir => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            },
            Component::Normal(_) => {
                depth += 1;
            },
            _ => {
                return false;
            },
        }
    }

    true
}

/// Safely join paths, preventing directory traversal
pub fn safe_join(base: &Path, path: &Path) -> PlinthResult<PathBuf> {
    if !is_safe_path(path) {
        return Err(PlinthError::io(
            format!("Refusing to write outside {}", base.display()),
            std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                format!("path traversal: {}", path.display()),
            ),
        ));
    }

    Ok(base.join(normalize_path(path)))
}

/// Canonical form of a package-relative file path for ownership comparison.
///
/// Backslashes become slashes, `.` segments and empty segments are dropped.
/// Case is preserved.
pub fn file_key(path: &str) -> String {
    path.replace('\\', "/")
        .split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .collect::<Vec<_>>()
        .join("/")
}
