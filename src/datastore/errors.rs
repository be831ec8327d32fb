//! Datastore errors.

use thiserror::Error;

/// Result type for datastore operations.
pub type DatastoreResult<T> = Result<T, DatastoreError>;

/// An opaque failure from the datastore, propagated but not interpreted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("datastore failure: {0}")]
pub struct DatastoreError(pub String);

impl DatastoreError {
    pub fn new(cause: impl Into<String>) -> Self {
        Self(cause.into())
    }
}
