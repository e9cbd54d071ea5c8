//! Error types for host store operations

use std::fmt;

/// Result type alias for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur while reading or mutating the host store
#[derive(Debug)]
pub enum StorageError {
    /// I/O error (file access, rename, etc.)
    IoError(std::io::Error),

    /// Host records could not be (de)serialized
    SerializationError(String),

    /// No host with the given id
    NotFound(String),

    /// A record is missing required fields
    InvalidRecord(String),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::IoError(err) => write!(f, "I/O error: {}", err),
            StorageError::SerializationError(msg) => {
                write!(f, "host record serialization error: {}", msg)
            }
            StorageError::NotFound(id) => write!(f, "no host with id {}", id),
            StorageError::InvalidRecord(msg) => write!(f, "invalid host record: {}", msg),
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StorageError::IoError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        StorageError::IoError(err)
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::SerializationError(err.to_string())
    }
}
