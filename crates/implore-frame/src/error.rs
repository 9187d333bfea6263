//! Error types for implore-frame
//!
//! Covers storage access, CSV materialization and the frame operations
//! pipelines apply to materialized values.

use thiserror::Error;

/// Errors that can occur in the tabular engine
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Unknown storage protocol: {0}")]
    UnknownProtocol(String),

    #[error("Storage option '{key}' is not accepted by {protocol} storage")]
    InvalidStorageOption { protocol: String, key: String },

    #[error("Storage error: {0}")]
    Storage(#[from] object_store::Error),

    #[error("Invalid URL '{url}': {message}")]
    InvalidUrl { url: String, message: String },

    #[error("CSV parsing error at record {record}: {message}")]
    Csv { record: usize, message: String },

    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    #[error("Length mismatch: expected {expected}, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("Type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },

    #[error("Operation '{operation}' is not supported for {dtype}")]
    UnsupportedOperation { operation: String, dtype: String },

    #[error("Unknown reduction: {0}")]
    UnknownReduction(String),

    #[error("Axis {0} is out of bounds")]
    InvalidAxis(i64),

    #[error("Frame has no index")]
    NoIndex,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FrameError {
    pub(crate) fn unsupported(operation: &str, dtype: impl std::fmt::Display) -> Self {
        FrameError::UnsupportedOperation {
            operation: operation.to_string(),
            dtype: dtype.to_string(),
        }
    }
}

/// Result type for engine operations
pub type FrameResult<T> = Result<T, FrameError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_not_found_display() {
        let err = FrameError::ColumnNotFound("beet".to_string());
        assert!(err.to_string().contains("beet"));
    }

    #[test]
    fn test_unsupported_display() {
        let err = FrameError::unsupported("mean", "String");
        assert_eq!(
            err.to_string(),
            "Operation 'mean' is not supported for String"
        );
    }
}
