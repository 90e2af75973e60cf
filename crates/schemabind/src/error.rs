//! # Error Types
//!
//! Every failure of a decode call is a [`DecodeError`]. All variants except
//! [`DecodeError::InvalidDestination`] carry the [`Path`] of the frame that
//! observed the failure; enclosing frames re-raise the error unchanged, so
//! the caller receives exactly one error pointing at the offending value.
//!
//! Nothing is retried or recovered internally.

use struson::reader::ReaderError;
use thiserror::Error;

use crate::path::Path;

/// Malformed or truncated token stream.
#[derive(Error, Debug)]
pub enum StreamError {
    /// The underlying JSON reader rejected the input.
    #[error("malformed JSON: {0}")]
    Reader(#[from] ReaderError),

    /// The token source ran out before the value was complete.
    #[error("unexpected end of token stream")]
    UnexpectedEnd,

    /// A closing delimiter appeared where a value was expected.
    #[error("unexpected {0} where a value was expected")]
    UnexpectedDelimiter(String),

    /// A number token whose literal is not a valid JSON number.
    #[error("invalid number literal {0:?}")]
    InvalidNumber(String),

    /// Data follows the root value.
    #[error("trailing data after the root value")]
    TrailingData,
}

/// Coarse classification of a [`DecodeError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// See [`DecodeError::InvalidDestination`].
    InvalidDestination,
    /// See [`DecodeError::Stream`].
    Stream,
    /// See [`DecodeError::StructuralMismatch`].
    StructuralMismatch,
    /// See [`DecodeError::UnknownProperty`].
    UnknownProperty,
    /// See [`DecodeError::ConstraintViolation`].
    ConstraintViolation,
    /// See [`DecodeError::MalformedKey`].
    MalformedKey,
    /// See [`DecodeError::DepthLimitExceeded`].
    DepthLimitExceeded,
}

/// Error returned by a decode or validate call.
#[derive(Error, Debug)]
pub enum DecodeError {
    /// The target is not a writable location. Reported before any token is read.
    #[error("invalid destination: {reason}")]
    InvalidDestination {
        /// Why the destination was rejected.
        reason: String,
    },

    /// The token stream is malformed or truncated.
    #[error("stream error at {path}: {source}")]
    Stream {
        /// Location of the value being read.
        path: Path,
        /// Underlying stream failure.
        #[source]
        source: StreamError,
    },

    /// The token category disagrees with the schema's type set or with the
    /// destination's static shape.
    #[error("structural mismatch at {path}: {message}")]
    StructuralMismatch {
        /// Location of the offending value.
        path: Path,
        /// Expected vs. found description.
        message: String,
    },

    /// An object member has no schema entry and additional properties are
    /// disallowed.
    #[error("unknown property {name:?} at {path}")]
    UnknownProperty {
        /// Location of the enclosing object.
        path: Path,
        /// The rejected member name.
        name: String,
    },

    /// The constraint checker rejected a scalar value.
    #[error("constraint violation at {path}: {}", .violations.join("; "))]
    ConstraintViolation {
        /// Location of the offending value.
        path: Path,
        /// One message per violated constraint.
        violations: Vec<String>,
    },

    /// An object key token is not a string.
    #[error("malformed key at {path}: expected a string, found {found}")]
    MalformedKey {
        /// Location of the enclosing object.
        path: Path,
        /// Description of the token found in key position.
        found: String,
    },

    /// Containers are nested deeper than the configured limit.
    #[error("nesting depth exceeds {limit} at {path}")]
    DepthLimitExceeded {
        /// Location of the container that crossed the limit.
        path: Path,
        /// Configured maximum depth.
        limit: usize,
    },
}

impl DecodeError {
    /// Classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            DecodeError::InvalidDestination { .. } => ErrorKind::InvalidDestination,
            DecodeError::Stream { .. } => ErrorKind::Stream,
            DecodeError::StructuralMismatch { .. } => ErrorKind::StructuralMismatch,
            DecodeError::UnknownProperty { .. } => ErrorKind::UnknownProperty,
            DecodeError::ConstraintViolation { .. } => ErrorKind::ConstraintViolation,
            DecodeError::MalformedKey { .. } => ErrorKind::MalformedKey,
            DecodeError::DepthLimitExceeded { .. } => ErrorKind::DepthLimitExceeded,
        }
    }

    /// Location of the failure, if the error was raised while decoding.
    pub fn path(&self) -> Option<&Path> {
        match self {
            DecodeError::InvalidDestination { .. } => None,
            DecodeError::Stream { path, .. }
            | DecodeError::StructuralMismatch { path, .. }
            | DecodeError::UnknownProperty { path, .. }
            | DecodeError::ConstraintViolation { path, .. }
            | DecodeError::MalformedKey { path, .. }
            | DecodeError::DepthLimitExceeded { path, .. } => Some(path),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constraint_violation_display_joins_messages() {
        let err = DecodeError::ConstraintViolation {
            path: Path::root().child("float64"),
            violations: vec!["101 is greater than the maximum of 10".to_string()],
        };
        let display = err.to_string();
        assert!(display.contains("float64"));
        assert!(display.contains("maximum of 10"));
        assert_eq!(err.kind(), ErrorKind::ConstraintViolation);
    }

    #[test]
    fn test_invalid_destination_has_no_path() {
        let err = DecodeError::InvalidDestination {
            reason: "void".to_string(),
        };
        assert!(err.path().is_none());
    }

    #[test]
    fn test_unknown_property_display() {
        let err = DecodeError::UnknownProperty {
            path: Path::root(),
            name: "missing".to_string(),
        };
        assert_eq!(err.to_string(), r#"unknown property "missing" at (root)"#);
    }
}
