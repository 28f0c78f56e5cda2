//! Error types for Keylink.
//!
//! This module provides a unified error type for all Keylink operations,
//! with specific error variants for different failure modes. Client-facing
//! variants carry a stable error code that the web layer maps to an HTTP
//! status.

use std::io;

use thiserror::Error;

/// A specialized `Result` type for Keylink operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for Keylink.
#[derive(Error, Debug)]
pub enum Error {
    /// Request used a verb other than GET (E001)
    #[error("method '{0}' not allowed")]
    MethodNotAllowed(String),

    /// Global request budget exhausted for this window (E002)
    #[error("rate limit exceeded")]
    RateLimited,

    /// Client reached the failed-attempt limit (E003)
    #[error("access denied for client {0}")]
    Banned(String),

    /// No link exists for the token (E004)
    #[error("link not found")]
    LinkNotFound,

    /// Link exists but its deadline has passed (E005)
    #[error("link expired")]
    LinkExpired,

    /// Link is active but its file is gone (E006)
    #[error("file behind link no longer exists: {0}")]
    FileMissing(String),

    /// Persistence backend failure (E007)
    #[error("storage error: {0}")]
    Storage(String),

    /// Path given for issuance could not be resolved
    #[error("path not found: {0}")]
    PathNotFound(String),

    /// Directory is larger than the archive size limit
    #[error("directory size {size} bytes exceeds the limit of {limit} bytes")]
    ArchiveTooLarge {
        /// Estimated uncompressed size
        size: u64,
        /// Configured limit
        limit: u64,
    },

    /// Archive creation failed
    #[error("archive error: {0}")]
    Archive(String),

    /// Operating system entropy source failed
    #[error("entropy source failure: {0}")]
    Entropy(String),

    /// Configuration file error
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// Invalid configuration value
    #[error("invalid configuration value for '{key}': {reason}")]
    InvalidConfig {
        /// Configuration key
        key: String,
        /// Reason for invalidity
        reason: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Internal error (should not happen)
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Returns the error code associated with this error, if any.
    ///
    /// Error codes follow the pattern EXXX where XXX is a 3-digit number.
    #[must_use]
    pub const fn code(&self) -> Option<&'static str> {
        match self {
            Self::MethodNotAllowed(_) => Some("E001"),
            Self::RateLimited => Some("E002"),
            Self::Banned(_) => Some("E003"),
            Self::LinkNotFound => Some("E004"),
            Self::LinkExpired => Some("E005"),
            Self::FileMissing(_) => Some("E006"),
            Self::Storage(_) => Some("E007"),
            _ => None,
        }
    }

    /// Returns whether this error counts against the requesting client.
    ///
    /// These are the outcomes that increment the failed-attempt counter.
    #[must_use]
    pub const fn is_client_failure(&self) -> bool {
        matches!(
            self,
            Self::LinkNotFound | Self::LinkExpired | Self::FileMissing(_)
        )
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<zip::result::ZipError> for Error {
    fn from(err: zip::result::ZipError) -> Self {
        Self::Archive(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(Error::MethodNotAllowed("POST".into()).code(), Some("E001"));
        assert_eq!(Error::RateLimited.code(), Some("E002"));
        assert_eq!(Error::Banned("10.0.0.1".into()).code(), Some("E003"));
        assert_eq!(Error::LinkNotFound.code(), Some("E004"));
        assert_eq!(Error::LinkExpired.code(), Some("E005"));
        assert_eq!(Error::FileMissing("/tmp/x".into()).code(), Some("E006"));
        assert_eq!(Error::Storage("disk".into()).code(), Some("E007"));
        assert_eq!(Error::Internal("boom".into()).code(), None);
    }

    #[test]
    fn test_client_failures() {
        assert!(Error::LinkNotFound.is_client_failure());
        assert!(Error::LinkExpired.is_client_failure());
        assert!(Error::FileMissing("/x".into()).is_client_failure());
        assert!(!Error::RateLimited.is_client_failure());
        assert!(!Error::Banned("a".into()).is_client_failure());
        assert!(!Error::Storage("a".into()).is_client_failure());
    }

    #[test]
    fn test_from_sqlite_error() {
        let err: Error = rusqlite::Error::InvalidQuery.into();
        assert!(matches!(err, Error::Storage(_)));
    }

    #[test]
    fn test_display() {
        let err = Error::ArchiveTooLarge {
            size: 2048,
            limit: 1024,
        };
        assert_eq!(
            err.to_string(),
            "directory size 2048 bytes exceeds the limit of 1024 bytes"
        );
    }
}
