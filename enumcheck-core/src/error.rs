//! Typed error handling for enumcheck.
//!
//! Provides structured errors that library consumers can match on,
//! with full context about what went wrong and where.

use std::path::PathBuf;
use thiserror::Error;

use crate::classfile::ClassFormatError;

/// Main error type for enumcheck operations.
///
/// This provides typed errors that library consumers can match on,
/// unlike opaque `anyhow::Error` types.
#[derive(Error, Debug)]
pub enum EnumcheckError {
    /// I/O error when reading/writing files
    #[error("I/O error at {path}: {message}")]
    Io {
        path: PathBuf,
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    /// Malformed class file
    #[error("Class format error in {path}: {source}")]
    ClassFormat {
        path: PathBuf,
        #[source]
        source: ClassFormatError,
    },

    /// Cache-related errors
    #[error("Cache error: {message}")]
    Cache { message: String },

    /// Configuration file errors
    #[error("Config error at {path}: {message}")]
    Config { path: PathBuf, message: String },

    /// Invalid argument provided
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    /// Generic internal error
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl EnumcheckError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            message: err.to_string(),
            source: Some(err),
        }
    }

    /// Create a class format error with path context.
    pub fn class_format(path: impl Into<PathBuf>, source: ClassFormatError) -> Self {
        Self::ClassFormat {
            path: path.into(),
            source,
        }
    }

    /// Create a cache error.
    pub fn cache(message: impl Into<String>) -> Self {
        Self::Cache {
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

    /// Check if this is a recoverable error (can continue analysis).
    ///
    /// A malformed class file or a stale cache only degrades one input;
    /// the surrounding scan keeps going.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::ClassFormat { .. } | Self::Cache { .. } | Self::Config { .. }
        )
    }

    /// Get the path associated with this error, if any.
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            Self::Io { path, .. } => Some(path),
            Self::ClassFormat { path, .. } => Some(path),
            Self::Config { path, .. } => Some(path),
            _ => None,
        }
    }
}

/// Convenience type alias for enumcheck results.
pub type EnumcheckResult<T> = Result<T, EnumcheckError>;

/// Extension trait for converting std::io::Error with path context.
pub trait IoResultExt<T> {
    /// Add path context to an I/O error.
    fn with_path(self, path: impl Into<PathBuf>) -> EnumcheckResult<T>;
}

impl<T> IoResultExt<T> for std::io::Result<T> {
    fn with_path(self, path: impl Into<PathBuf>) -> EnumcheckResult<T> {
        self.map_err(|e| EnumcheckError::io(path, e))
    }
}
