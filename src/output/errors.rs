//! Output pipeline errors.

use thiserror::Error;

use crate::datastore::DatastoreError;
use crate::query::OutputFormat;

/// Result type for the output pipeline.
pub type OutputResult<T> = Result<T, OutputError>;

/// A failure while serializing the result stream.
#[derive(Debug, Error)]
pub enum OutputError {
    /// No encoder registered for the requested format.
    #[error("no encoder is registered for format {0}")]
    NoEncoder(OutputFormat),

    /// The byte sink failed (transport backpressure, disconnect).
    #[error("sink write failed: {0}")]
    Io(#[from] std::io::Error),

    /// The encoder failed to render an entity.
    #[error("encoding failed: {0}")]
    Encode(#[from] serde_json::Error),

    /// The datastore failed mid-stream.
    #[error(transparent)]
    Datastore(#[from] DatastoreError),
}

impl OutputError {
    /// Whether this failure happened before any result byte could have
    /// been written. Only those may be signaled cleanly to the client.
    pub fn is_preflight(&self) -> bool {
        matches!(self, Self::NoEncoder(_))
    }
}
