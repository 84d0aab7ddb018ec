//! Unified error handling for the annuaire crate
//!
//! This module provides a single [`Error`] enum consolidating the failure
//! modes of the ingestion pipeline, together with an [`ErrorCategory`]
//! classification used to pick a handling strategy:
//!
//! - `InvalidCategory` is always recovered locally (fallback collection).
//! - `StorageWrite` is a per-record failure; the batch continues.
//! - `StoreConnection` is fatal to the whole run.

use std::io;
use thiserror::Error;

pub use crate::store::StoreError;

/// Classification of errors for handling strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Malformed or unusable input data
    Input,
    /// Store-level write and read failures
    Storage,
    /// Store connectivity failures
    Connection,
    /// Configuration and validation errors
    Config,
    /// Other/unknown errors
    Other,
}

impl ErrorCategory {
    /// Human-readable description for the category
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Input => "input error",
            Self::Storage => "storage error",
            Self::Connection => "connection error",
            Self::Config => "configuration error",
            Self::Other => "other error",
        }
    }
}

/// Unified error type for the annuaire crate
#[derive(Error, Debug)]
pub enum Error {
    /// Category label is empty or reduces to nothing under sanitization;
    /// callers substitute the fallback collection instead of propagating
    #[error("invalid category: {0:?}")]
    InvalidCategory(String),

    /// Record cannot be stored at all (e.g. no usable name); per-record,
    /// never aborts the batch
    #[error("invalid record: {0}")]
    InvalidRecord(String),

    /// A store-level write failed for one record; carries enough context
    /// for manual replay
    #[error("storage write failed for {hash_id} in collection {collection}")]
    StorageWrite {
        collection: String,
        hash_id: String,
        #[source]
        source: StoreError,
    },

    /// Could not reach the document store; fatal to the run
    #[error("store connection failed: {0}")]
    StoreConnection(#[source] StoreError),

    /// Store errors outside the write path (listing, aggregation)
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Configuration errors
    #[error("config error: {0}")]
    Config(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a per-record storage write error
    pub fn storage_write(
        collection: impl Into<String>,
        hash_id: impl Into<String>,
        source: StoreError,
    ) -> Self {
        Self::StorageWrite {
            collection: collection.into(),
            hash_id: hash_id.into(),
            source,
        }
    }

    /// Check if this error is recoverable (the operation can be retried or
    /// the failure contained to one record)
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::InvalidCategory(_) => true,
            Self::InvalidRecord(_) => false,
            Self::StorageWrite { source, .. } => source.is_conflict(),
            Self::StoreConnection(_) => false,
            Self::Store(e) => e.is_conflict(),
            Self::Config(_) => false,
            Self::Json(_) => false,
            Self::Io(_) => true,
        }
    }

    /// Get the error category for handling strategies
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidCategory(_) | Self::InvalidRecord(_) | Self::Json(_) => {
                ErrorCategory::Input
            }
            Self::StorageWrite { .. } | Self::Store(_) | Self::Io(_) => ErrorCategory::Storage,
            Self::StoreConnection(_) => ErrorCategory::Connection,
            Self::Config(_) => ErrorCategory::Config,
        }
    }
}

/// Result type alias using the unified Error type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_category_is_recoverable() {
        let err = Error::InvalidCategory(String::new());
        assert!(err.is_recoverable());
        assert_eq!(err.category(), ErrorCategory::Input);
    }

    #[test]
    fn test_connection_error_is_fatal() {
        let err = Error::StoreConnection(StoreError::Connection("refused".to_string()));
        assert!(!err.is_recoverable());
        assert_eq!(err.category(), ErrorCategory::Connection);
    }

    #[test]
    fn test_write_conflict_is_recoverable() {
        let err = Error::storage_write(
            "restaurant",
            "abc123",
            StoreError::WriteConflict {
                hash_id: "abc123".to_string(),
            },
        );
        assert!(err.is_recoverable());
        assert_eq!(err.category(), ErrorCategory::Storage);
    }

    #[test]
    fn test_plain_write_failure_is_not_recoverable() {
        let err = Error::storage_write(
            "restaurant",
            "abc123",
            StoreError::Write("disk full".to_string()),
        );
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_config_error() {
        let err = Error::config("bad merge policy");
        assert_eq!(err.category(), ErrorCategory::Config);
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_write_error_carries_context() {
        let err = Error::storage_write("coiffeur", "deadbeef", StoreError::Write("x".to_string()));
        let msg = err.to_string();
        assert!(msg.contains("coiffeur"));
        assert!(msg.contains("deadbeef"));
    }
}
