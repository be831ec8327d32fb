//! Execution errors.

use thiserror::Error;

use crate::datastore::DatastoreError;

/// Result type for execution orchestration.
pub type ExecResult<T> = Result<T, ExecError>;

/// Why a descriptor could not be executed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExecError {
    /// The query carries no selector of any kind.
    #[error("query must include at least one selector")]
    NoSelectors,

    /// Summed bounding box area is over the configured ceiling.
    #[error("total bounding box area {area} exceeds the maximum of {max} square degrees")]
    AreaLimitExceeded { area: f64, max: f64 },

    /// Grammatically valid but not executable.
    #[error("unsupported operation: {0}")]
    Unsupported(String),

    /// Opaque datastore failure, propagated as-is.
    #[error(transparent)]
    Datastore(#[from] DatastoreError),
}
