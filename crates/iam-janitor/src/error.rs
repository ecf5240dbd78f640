//! Fatal error types for a sweep run
//!
//! Per-item revocation failures are not errors at this level; they are
//! recorded in [`iam_janitor_common::RevocationResult`].

use iam_janitor_common::{DirectoryError, DirectoryOperation, PolicyError};
use thiserror::Error;

/// Configuration validation errors. Raised before any AWS call.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// max_inactive_days not provided by file, flag or environment
    #[error("max_inactive_days is required (set --max-inactive-days or JANITOR_MAX_INACTIVE_DAYS)")]
    MissingMaxInactiveDays,

    /// max_inactive_days out of range
    #[error("invalid max_inactive_days: {0}")]
    InvalidPolicy(#[from] PolicyError),

    /// concurrency is zero
    #[error("concurrency must be at least 1")]
    InvalidConcurrency,

    /// max_attempts is zero
    #[error("max_attempts must be at least 1")]
    InvalidMaxAttempts,

    /// deadline_secs is zero
    #[error("deadline_secs must be greater than 0")]
    InvalidDeadline,

    /// environment is empty
    #[error("environment cannot be empty")]
    EmptyEnvironment,

    /// region set but empty
    #[error("region cannot be empty")]
    EmptyRegion,

    /// Failed to parse JSON configuration
    #[error("failed to parse config file '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// Failed to read configuration file
    #[error("failed to read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl ConfigError {
    /// Create an IO error with path context
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a parse error with path context
    pub fn parse(path: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Parse {
            path: path.into(),
            source,
        }
    }
}

/// Snapshot collection failed; nothing is revoked
#[derive(Debug, Error)]
pub enum CollectionError {
    /// A directory call failed for good (non-retryable, or retries exhausted)
    #[error("{operation} failed for '{target}' after {attempts} attempt(s)")]
    Directory {
        operation: DirectoryOperation,
        target: String,
        attempts: u32,
        #[source]
        source: DirectoryError,
    },

    /// The run was cancelled (deadline or termination signal)
    #[error("collection cancelled before the snapshot was complete")]
    Cancelled,
}

impl CollectionError {
    /// The underlying directory error, if any
    pub fn directory_error(&self) -> Option<&DirectoryError> {
        match self {
            CollectionError::Directory { source, .. } => Some(source),
            CollectionError::Cancelled => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            ConfigError::InvalidConcurrency.to_string(),
            "concurrency must be at least 1"
        );
        assert_eq!(
            ConfigError::InvalidPolicy(PolicyError::NonPositiveDays(0)).to_string(),
            "invalid max_inactive_days: max_inactive_days must be greater than 0, got 0"
        );
    }

    #[test]
    fn test_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = ConfigError::io("/etc/janitor.json", io_err);
        assert!(err.to_string().contains("/etc/janitor.json"));
    }

    #[test]
    fn test_collection_error_display() {
        let err = CollectionError::Directory {
            operation: DirectoryOperation::ListAccessKeys,
            target: "alice".into(),
            attempts: 5,
            source: DirectoryError::ServiceFailure("internal".into()),
        };
        assert_eq!(
            err.to_string(),
            "ListAccessKeys failed for 'alice' after 5 attempt(s)"
        );
        assert!(err.directory_error().is_some_and(|e| e.is_retryable()));
        assert!(CollectionError::Cancelled.directory_error().is_none());
    }
}
