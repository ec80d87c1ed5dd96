//! Error types and result aliases for Plinth operations.
//!
//! Provides a unified error type that covers every failure the package
//! manager can report, with actionable messages and a stable mapping to
//! process exit codes.

use thiserror::Error;

/// Boxed error source carried by transport and filesystem failures
pub type BoxedSource = Box<dyn std::error::Error + Send + Sync>;

/// Unified error type for all Plinth operations
#[derive(Error, Debug)]
pub enum PlinthError {
    // Parse errors
    #[error("Invalid version '{input}': {reason}")]
    Parse { input: String, reason: String },

    // Config errors
    #[error("Failed to parse plinth.toml: {message} at line {line}, column {column}")]
    TomlParse {
        message: String,
        line: usize,
        column: usize,
    },

    #[error("Configuration field '{field}' is invalid: {reason}")]
    ConfigValidation { field: String, reason: String },

    // Gather errors
    #[error("Package '{name}' ({version}) not found in any repository")]
    PackageNotFound { name: String, version: String },

    #[error("Package '{name}' is ambiguous, candidates: {variants}")]
    AmbiguousPackage { name: String, variants: String },

    // Resolution errors
    #[error("Unable to resolve dependencies: {dependencies}")]
    UnresolvedDependencies { dependencies: String },

    #[error("Installing {package} would break installed packages: {details}")]
    DependencyConflict { package: String, details: String },

    #[error("{package} would overwrite {count} file(s) owned by other packages: {files}")]
    FileOverwriteConflict {
        package: String,
        count: usize,
        files: String,
    },

    // Transfer errors
    #[error("Failed to download {package}: {message}")]
    DownloadFailure {
        package: String,
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },

    #[error("Network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },

    #[error("Integrity check failed for {package}: expected {expected}, got {actual}")]
    IntegrityFailure {
        package: String,
        expected: String,
        actual: String,
    },

    // Install errors
    #[error("Failed to install {package}: {message}")]
    InstallFailure {
        package: String,
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },

    // Workflow control
    #[error("Operation timed out after {seconds} seconds")]
    Timeout { seconds: u64 },

    #[error("Operation cancelled")]
    Cancelled,

    // IO errors
    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias for Plinth operations
pub type PlinthResult<T> = Result<T, PlinthError>;

impl PlinthError {
    /// Create a parse error for the given input
    pub fn parse(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Parse {
            input: input.into(),
            reason: reason.into(),
        }
    }

    /// Create a network error from any error type
    pub fn network<E>(message: String, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Network {
            message,
            source: Some(Box::new(source)),
        }
    }

    /// Create an IO error from std::io::Error
    pub fn io(message: String, source: std::io::Error) -> Self {
        Self::Io { message, source }
    }

    /// Wrap any error as a download failure for `package`
    pub fn download(package: impl Into<String>, source: PlinthError) -> Self {
        Self::DownloadFailure {
            package: package.into(),
            message: source.to_string(),
            source: Some(Box::new(source)),
        }
    }

    /// Wrap any error as an install failure for `package`
    pub fn install(package: impl Into<String>, source: PlinthError) -> Self {
        Self::InstallFailure {
            package: package.into(),
            message: source.to_string(),
            source: Some(Box::new(source)),
        }
    }

    /// Check if this error is recoverable
    pub fn is_recoverable(&self) -> bool {
        matches!(self, PlinthError::Network { .. } | PlinthError::Io { .. })
    }

    /// Process exit code reported by the CLI for this error
    pub fn exit_code(&self) -> u8 {
        match self {
            PlinthError::Cancelled => 2,
            PlinthError::UnresolvedDependencies { .. }
            | PlinthError::DependencyConflict { .. }
            | PlinthError::FileOverwriteConflict { .. }
            | PlinthError::PackageNotFound { .. }
            | PlinthError::AmbiguousPackage { .. } => 4,
            PlinthError::InstallFailure { .. } | PlinthError::Io { .. } => 5,
            PlinthError::DownloadFailure { .. }
            | PlinthError::Network { .. }
            | PlinthError::IntegrityFailure { .. } => 6,
            _ => 1,
        }
    }

    /// Get a user-friendly suggestion for fixing this error
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            PlinthError::PackageNotFound { .. } => {
                Some("Check the package name spelling or add a repository with --repository")
            },
            PlinthError::AmbiguousPackage { .. } => {
                Some("Select a variant with --os or --architecture")
            },
            PlinthError::UnresolvedDependencies { .. } => {
                Some("Add a repository that provides the missing packages, or use --force")
            },
            PlinthError::DependencyConflict { .. } => {
                Some("Upgrade the affected packages as well, or use --force")
            },
            PlinthError::FileOverwriteConflict { .. } => {
                Some("Uninstall the owning package first, or use --force to overwrite")
            },
            PlinthError::Network { .. } | PlinthError::DownloadFailure { .. } => {
                Some("Check your connection and the repository location, then try again")
            },
            PlinthError::Timeout { .. } => Some("Increase the limit with --timeout"),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(PlinthError::Cancelled.exit_code(), 2);
        assert_eq!(
            PlinthError::UnresolvedDependencies {
                dependencies: "Missing ^1.0".to_string()
            }
            .exit_code(),
            4
        );
        assert_eq!(
            PlinthError::InstallFailure {
                package: "A 1.0.0".to_string(),
                message: "disk full".to_string(),
                source: None,
            }
            .exit_code(),
            5
        );
        assert_eq!(
            PlinthError::download("A 1.0.0", PlinthError::Cancelled).exit_code(),
            6
        );
        assert_eq!(PlinthError::Timeout { seconds: 5 }.exit_code(), 1);
    }

    #[test]
    fn test_messages_name_the_package() {
        let err = PlinthError::UnresolvedDependencies {
            dependencies: "Missing ^1.0".to_string(),
        };
        assert!(err.to_string().contains("Missing ^1.0"));

        let err = PlinthError::install("Tool 2.0.0", PlinthError::Cancelled);
        assert!(err.to_string().contains("Tool 2.0.0"));
    }

    #[test]
    fn test_recoverable() {
        let err = PlinthError::io(
            "read failed".to_string(),
            std::io::Error::new(std::io::ErrorKind::Other, "boom"),
        );
        assert!(err.is_recoverable());
        assert!(!PlinthError::Cancelled.is_recoverable());
        assert!(err.suggestion().is_none());
    }
}
