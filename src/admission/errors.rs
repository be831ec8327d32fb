//! Admission errors.

use thiserror::Error;

/// Result type for admission decisions.
pub type AdmissionResult<T> = Result<T, AdmissionError>;

/// Why a request was refused admission.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdmissionError {
    /// An identical query from the same origin is already executing.
    #[error("an identical request from {origin} is already running; be patient")]
    Duplicate { query: String, origin: String },
}
