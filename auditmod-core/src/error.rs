//! Typed error handling for auditmod.
//!
//! Provides structured errors that library consumers can match on,
//! with context about which unit or setting was involved.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for auditmod operations.
#[derive(Error, Debug)]
pub enum AuditError {
    /// I/O error when reading a unit or writing a report
    #[error("I/O error at {path}: {message}")]
    Io {
        path: PathBuf,
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    /// Unit bytes are not valid UTF-8
    #[error("Decode error in {path}: {message}")]
    Decode { path: PathBuf, message: String },

    /// Configuration file errors
    #[error("Config error at {path}: {message}")]
    Config { path: PathBuf, message: String },

    /// Invalid argument provided (bad root, bad output path)
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    /// Report serialization or persistence errors
    #[error("Report error: {message}")]
    Report { message: String },
}

impl AuditError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            message: err.to_string(),
            source: Some(err),
        }
    }

    /// Create a decode error for a unit that is not UTF-8.
    pub fn decode(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Decode {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a config error.
    pub fn config(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Config {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create an invalid-argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create a report error.
    pub fn report(message: impl Into<String>) -> Self {
        Self::Report {
            message: message.into(),
        }
    }

    /// Check if this is a recoverable error (the unit is skipped, the run continues).
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Io { .. } | Self::Decode { .. } | Self::Config { .. })
    }

    /// Get the path associated with this error, if any.
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            Self::Io { path, .. } => Some(path),
            Self::Decode { path, .. } => Some(path),
            Self::Config { path, .. } => Some(path),
            _ => None,
        }
    }
}

/// Convenience type alias for auditmod results.
pub type AuditResult<T> = Result<T, AuditError>;

/// Extension trait for converting std::io::Error with path context.
pub trait IoResultExt<T> {
    /// Add path context to an I/O error.
    fn with_path(self, path: impl Into<PathBuf>) -> AuditResult<T>;
}

impl<T> IoResultExt<T> for std::io::Result<T> {
    fn with_path(self, path: impl Into<PathBuf>) -> AuditResult<T> {
        self.map_err(|e| AuditError::io(path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error() {
        let err = AuditError::io(
            PathBuf::from("/corpus/src/lib.rs"),
            std::io::Error::new(std::io::ErrorKind::NotFound, "file not found"),
        );
        assert!(matches!(err, AuditError::Io { .. }));
        assert_eq!(err.path(), Some(&PathBuf::from("/corpus/src/lib.rs")));
        assert!(err.to_string().contains("/corpus/src/lib.rs"));
    }

    #[test]
    fn test_decode_error_is_recoverable() {
        let err = AuditError::decode("/corpus/bad.rs", "invalid utf-8 sequence");
        assert!(err.is_recoverable());
        assert!(err.to_string().contains("invalid utf-8"));
    }

    #[test]
    fn test_fatal_errors() {
        assert!(!AuditError::invalid_argument("root missing").is_recoverable());
        assert!(!AuditError::report("write failed").is_recoverable());
        assert_eq!(AuditError::report("x").path(), None);
    }

    #[test]
    fn test_io_result_ext() {
        let result: std::io::Result<()> =
            Err(std::io::Error::new(std::io::ErrorKind::NotFound, "missing"));
        let audit_result = result.with_path("/missing/file.rs");
        assert!(matches!(audit_result, Err(AuditError::Io { .. })));
    }
}
