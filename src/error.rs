//! Structured error types for store operations.

use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    DatabaseError,
    MigrationError,
    IoError,
    PreferenceError,
    InternalError,
}

/// Storage failure. Fatal for the operation that hit it; never retried.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("schema migration failed: {0}")]
    Migration(#[from] refinery::Error),

    #[error("storage worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("preference encoding failed: {0}")]
    PreferenceEncoding(#[from] serde_yaml::Error),

    #[error("database connection lock poisoned")]
    LockPoisoned,
}

impl StoreError {
    pub fn code(&self) -> ErrorCode {
        match self {
            StoreError::Database(_) => ErrorCode::DatabaseError,
            StoreError::Migration(_) => ErrorCode::MigrationError,
            StoreError::Io { .. } => ErrorCode::IoError,
            StoreError::PreferenceEncoding(_) => ErrorCode::PreferenceError,
            StoreError::Worker(_) | StoreError::LockPoisoned => ErrorCode::InternalError,
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_serialize_screaming_snake() {
        let json = serde_json::to_string(&ErrorCode::DatabaseError).unwrap();
        assert_eq!(json, "\"DATABASE_ERROR\"");
    }

    #[test]
    fn io_error_carries_path() {
        let err = StoreError::io(
            "/tmp/prefs.yaml",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert_eq!(err.code(), ErrorCode::IoError);
        assert!(err.to_string().contains("/tmp/prefs.yaml"));
    }

    #[test]
    fn database_errors_map_to_database_code() {
        let err = StoreError::from(rusqlite::Error::InvalidQuery);
        assert_eq!(err.code(), ErrorCode::DatabaseError);
    }
}
