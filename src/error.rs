//! Error Types
//!
//! Every fallible operation in the crate returns [`DataResult`]. Errors carry a
//! human readable message and a machine-readable [`ErrorKind`]:
//!
//! - `InvalidArgument`: caller-recoverable problems with the inputs (malformed
//!   container schemas, missing embedded schemas, schema conflicts between
//!   two bags, shape mismatches, unsortable group keys).
//! - `FailedPrecondition`: a write was attempted on an immutable bag.
//! - `Internal`: a schema representation that should never reach the engine
//!   (ANY schema, a non-schema value used as a schema).

use thiserror::Error;

/// Machine-readable classification of a [`DataError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidArgument,
    FailedPrecondition,
    Internal,
}

/// Engine errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DataError {
    /// Invalid user input or API parameter
    #[error("{0}")]
    InvalidArgument(String),

    /// The target is in a state that forbids the operation
    #[error("{0}")]
    FailedPrecondition(String),

    /// Invariant violation inside the engine
    #[error("{0}")]
    Internal(String),
}

impl DataError {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        DataError::InvalidArgument(msg.into())
    }

    pub fn failed_precondition(msg: impl Into<String>) -> Self {
        DataError::FailedPrecondition(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        DataError::Internal(msg.into())
    }

    /// Get the error classification
    pub fn kind(&self) -> ErrorKind {
        match self {
            DataError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            DataError::FailedPrecondition(_) => ErrorKind::FailedPrecondition,
            DataError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// The message without the kind prefix
    pub fn message(&self) -> &str {
        match self {
            DataError::InvalidArgument(msg)
            | DataError::FailedPrecondition(msg)
            | DataError::Internal(msg) => msg,
        }
    }
}

/// Result type for engine operations
pub type DataResult<T> = Result<T, DataError>;
