//! Storage errors
//!
//! Lookups never fail on bad input (unknown class or id degrade to empty or
//! `None`); these variants cover a broken medium, malformed durable state,
//! and constraint violations at commit.

use std::path::{Path, PathBuf};

use crate::models::EntityKind;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors raised by the storage layer.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("malformed store {path}: {reason}")]
    Malformed { path: PathBuf, reason: String },

    #[error("unknown class: {0}")]
    UnknownClass(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("{0} has no table in the database backend")]
    Unmapped(EntityKind),

    #[error("storage facade not initialized")]
    NotInitialized,

    #[error("storage facade already initialized")]
    AlreadyInitialized,

    #[error("storage facade lock poisoned")]
    Poisoned,

    #[error("password hashing failed: {0}")]
    Password(String),
}

impl StorageError {
    /// IO failure on a specific path.
    pub fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Durable content that cannot be turned back into objects.
    pub fn malformed(path: &Path, reason: impl Into<String>) -> Self {
        Self::Malformed {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }

    /// Classify a failed commit: constraint violations become `Validation`.
    pub fn from_commit(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(code, message)
                if code.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Self::Validation(message.unwrap_or_else(|| code.to_string()))
            }
            other => Self::Database(other),
        }
    }

    /// True for constraint violations surfaced by `save()`.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

// =============================================================================
// Tests
// =============================================================================
