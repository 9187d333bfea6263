//! Error types for implore-readers
//!
//! Every error carries an [`ErrorClass`], the coarse kind that retry
//! allow-lists are written against. Classes serialize by name so they can be
//! stored in catalog entries.

use implore_frame::FrameError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Coarse classification of a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ErrorClass {
    /// Matches every other class in an allow-list
    Exception,
    RuntimeError,
    ValueError,
    KeyError,
    IndexError,
    TypeError,
    AttributeError,
    NameError,
    IoError,
    NotImplementedError,
}

impl ErrorClass {
    pub fn name(&self) -> &'static str {
        match self {
            ErrorClass::Exception => "Exception",
            ErrorClass::RuntimeError => "RuntimeError",
            ErrorClass::ValueError => "ValueError",
            ErrorClass::KeyError => "KeyError",
            ErrorClass::IndexError => "IndexError",
            ErrorClass::TypeError => "TypeError",
            ErrorClass::AttributeError => "AttributeError",
            ErrorClass::NameError => "NameError",
            ErrorClass::IoError => "IoError",
            ErrorClass::NotImplementedError => "NotImplementedError",
        }
    }

    /// Whether an allow-list entry of this class covers `other`
    pub fn covers(&self, other: ErrorClass) -> bool {
        *self == ErrorClass::Exception || *self == other
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ErrorClass {
    type Err = ReaderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let class = match s {
            "Exception" => ErrorClass::Exception,
            "RuntimeError" => ErrorClass::RuntimeError,
            "ValueError" => ErrorClass::ValueError,
            "KeyError" => ErrorClass::KeyError,
            "IndexError" => ErrorClass::IndexError,
            "TypeError" => ErrorClass::TypeError,
            "AttributeError" => ErrorClass::AttributeError,
            "NameError" => ErrorClass::NameError,
            "IoError" | "OSError" => ErrorClass::IoError,
            "NotImplementedError" => ErrorClass::NotImplementedError,
            other => return Err(ReaderError::UnknownClass(other.to_string())),
        };
        Ok(class)
    }
}

impl TryFrom<String> for ErrorClass {
    type Error = ReaderError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ErrorClass> for String {
    fn from(class: ErrorClass) -> Self {
        class.name().to_string()
    }
}

/// Errors raised while building, serializing or reading pipelines
#[derive(Debug, Error)]
pub enum ReaderError {
    /// Failure inside the tabular engine or storage
    #[error(transparent)]
    Frame(#[from] FrameError),

    /// Failure raised by a registered function
    #[error("{class}: {message}")]
    Function { class: ErrorClass, message: String },

    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    #[error("Unknown method '{method}' for {target}")]
    UnknownMethod { method: String, target: String },

    #[error("Unknown namespace '{namespace}' (available: {available:?})")]
    UnknownNamespace {
        namespace: String,
        available: Vec<String>,
    },

    #[error("Invalid argument for '{operation}': {message}")]
    InvalidArgument { operation: String, message: String },

    #[error("Path '{path}' not found at segment '{segment}'")]
    PathNotFound { path: String, segment: String },

    #[error("Invalid entry: {0}")]
    InvalidEntry(String),

    #[error("Unknown class: {0}")]
    UnknownClass(String),

    #[error("Parameter '{0}' already exists")]
    DuplicateParameter(String),

    #[error("Unknown parameter: {0}")]
    UnknownParameter(String),

    #[error("Environment variable not set: {0}")]
    MissingEnvVar(String),

    #[error("No value for placeholder '{{{0}}}'")]
    UnresolvedPlaceholder(String),

    #[error("Data reference not found: {0}")]
    DataRefNotFound(String),

    #[error("Entry not found: {0}")]
    EntryNotFound(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ReaderError {
    /// An error a pipeline function raises, with an explicit class
    pub fn raised(class: ErrorClass, message: impl Into<String>) -> Self {
        ReaderError::Function {
            class,
            message: message.into(),
        }
    }

    pub fn runtime(message: impl Into<String>) -> Self {
        Self::raised(ErrorClass::RuntimeError, message)
    }

    pub fn value(message: impl Into<String>) -> Self {
        Self::raised(ErrorClass::ValueError, message)
    }

    pub(crate) fn invalid_argument(operation: &str, message: impl Into<String>) -> Self {
        ReaderError::InvalidArgument {
            operation: operation.to_string(),
            message: message.into(),
        }
    }

    /// The class retry allow-lists match against
    pub fn class(&self) -> ErrorClass {
        match self {
            ReaderError::Frame(e) => match e {
                FrameError::FileNotFound(_) | FrameError::Io(_) | FrameError::Storage(_) => {
                    ErrorClass::IoError
                }
                FrameError::ColumnNotFound(_) => ErrorClass::KeyError,
                FrameError::TypeMismatch { .. } | FrameError::UnsupportedOperation { .. } => {
                    ErrorClass::TypeError
                }
                FrameError::UnknownReduction(_) => ErrorClass::AttributeError,
                FrameError::UnknownProtocol(_)
                | FrameError::InvalidUrl { .. }
                | FrameError::Csv { .. }
                | FrameError::InvalidStorageOption { .. }
                | FrameError::InvalidAxis(_)
                | FrameError::LengthMismatch { .. }
                | FrameError::NoIndex => ErrorClass::ValueError,
            },
            ReaderError::Function { class, .. } => *class,
            ReaderError::UnknownFunction(_) | ReaderError::DuplicateParameter(_) => {
                ErrorClass::NameError
            }
            ReaderError::UnknownMethod { .. } | ReaderError::UnknownNamespace { .. } => {
                ErrorClass::AttributeError
            }
            ReaderError::InvalidArgument { .. } | ReaderError::UnknownClass(_) => {
                ErrorClass::TypeError
            }
            ReaderError::PathNotFound { .. }
            | ReaderError::UnknownParameter(_)
            | ReaderError::MissingEnvVar(_)
            | ReaderError::UnresolvedPlaceholder(_)
            | ReaderError::DataRefNotFound(_)
            | ReaderError::EntryNotFound(_) => ErrorClass::KeyError,
            ReaderError::InvalidEntry(_)
            | ReaderError::Config(_)
            | ReaderError::Serialization(_) => ErrorClass::ValueError,
        }
    }
}

/// Result type for reader operations
pub type ReaderResult<T> = Result<T, ReaderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_round_trips_by_name() {
        let class: ErrorClass = "RuntimeError".parse().unwrap();
        assert_eq!(class, ErrorClass::RuntimeError);
        assert_eq!(String::from(class), "RuntimeError");
        assert!("Bogus".parse::<ErrorClass>().is_err());
    }

    #[test]
    fn test_exception_covers_everything() {
        assert!(ErrorClass::Exception.covers(ErrorClass::KeyError));
        assert!(ErrorClass::ValueError.covers(ErrorClass::ValueError));
        assert!(!ErrorClass::ValueError.covers(ErrorClass::RuntimeError));
    }

    #[test]
    fn test_frame_errors_are_classified() {
        let err = ReaderError::from(FrameError::ColumnNotFound("x".into()));
        assert_eq!(err.class(), ErrorClass::KeyError);
        let err = ReaderError::from(FrameError::FileNotFound("memory://x".into()));
        assert_eq!(err.class(), ErrorClass::IoError);
    }

    #[test]
    fn test_raised_display() {
        let err = ReaderError::runtime("boom");
        assert_eq!(err.to_string(), "RuntimeError: boom");
        assert_eq!(err.class(), ErrorClass::RuntimeError);
    }

    #[test]
    fn test_placeholder_display_keeps_braces() {
        let err = ReaderError::UnresolvedPlaceholder("key".into());
        assert_eq!(err.to_string(), "No value for placeholder '{key}'");
    }
}
