//! # API Errors
//!
//! Error types for the HTTP query endpoint.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use crate::admission::AdmissionError;
use crate::exec::ExecError;
use crate::output::OutputError;
use crate::query::ParseError;

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

/// Query endpoint errors
#[derive(Debug, Error)]
pub enum ApiError {
    /// The query text could not be parsed
    #[error("{0}")]
    Parse(#[from] ParseError),

    /// An identical request is already running
    #[error("{0}")]
    Admission(#[from] AdmissionError),

    /// Query validation or execution failure
    #[error("{0}")]
    Exec(#[from] ExecError),

    /// Output pipeline failure
    #[error("{0}")]
    Output(#[from] OutputError),

    /// Unclassified server failure
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 400 Bad Request: the client sent something we cannot serve
            ApiError::Parse(_) => StatusCode::BAD_REQUEST,
            ApiError::Exec(ExecError::NoSelectors) => StatusCode::BAD_REQUEST,
            ApiError::Exec(ExecError::AreaLimitExceeded { .. }) => StatusCode::BAD_REQUEST,
            ApiError::Exec(ExecError::Unsupported(_)) => StatusCode::BAD_REQUEST,
            ApiError::Output(OutputError::NoEncoder(_)) => StatusCode::BAD_REQUEST,

            // 409 Conflict: same query from the same origin is in flight
            ApiError::Admission(AdmissionError::Duplicate { .. }) => StatusCode::CONFLICT,

            // 500 Internal Server Error
            ApiError::Exec(ExecError::Datastore(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Output(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
}

impl From<ApiError> for ErrorResponse {
    fn from(err: ApiError) -> Self {
        Self {
            code: err.status_code().as_u16(),
            error: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(ErrorResponse::from(self));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::OutputFormat;

    #[test]
    fn test_parse_errors_are_bad_request() {
        let err = ApiError::Parse(ParseError::UnknownKind {
            word: "planet".to_string(),
            offset: 0,
        });
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_duplicate_is_conflict() {
        let err = ApiError::Admission(AdmissionError::Duplicate {
            query: "node[amenity=pub]".to_string(),
            origin: "127.0.0.1".to_string(),
        });
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_missing_encoder_is_bad_request() {
        let err = ApiError::Output(OutputError::NoEncoder(OutputFormat::Json));
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_datastore_failure_is_server_error() {
        let err = ApiError::Exec(ExecError::Datastore(
            crate::datastore::DatastoreError::new("cursor lost"),
        ));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
