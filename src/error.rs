//! Error types for the transit cache
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;
use crate::transit::UpstreamError;

// == Cache Error Enum ==
/// Unified error type for the cache, its backends and the HTTP surface.
///
/// A cache miss is not an error: lookups report absence as `None`.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Requested resource does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Lock acquisition exceeded its deadline
    #[error("Unable to acquire the lock for key: {0}")]
    LockTimeout(String),

    /// Stored bytes could not be decoded, or a value could not be encoded
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Attempt to encode an absent (null) value
    #[error("Serialization error: value is absent")]
    AbsentValue,

    /// Transport or connection failure talking to a backend
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    /// The backend answered, but with an error or an unexpected reply
    #[error("Backend error: {0}")]
    Backend(String),

    /// Failure reported by the upstream data provider
    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Invalid or missing configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        CacheError::Serialization(err.to_string())
    }
}

impl From<redis::RedisError> for CacheError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_io_error()
            || err.is_connection_dropped()
            || err.is_connection_refusal()
            || err.is_timeout()
        {
            CacheError::BackendUnavailable(err.to_string())
        } else if err.kind() == redis::ErrorKind::TypeError {
            CacheError::Serialization(err.to_string())
        } else {
            CacheError::Backend(err.to_string())
        }
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::NotFound(_) => StatusCode::NOT_FOUND,
            CacheError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            CacheError::LockTimeout(_) | CacheError::BackendUnavailable(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            CacheError::Upstream(_) => StatusCode::BAD_GATEWAY,
            CacheError::Serialization(_)
            | CacheError::AbsentValue
            | CacheError::Backend(_)
            | CacheError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }

        let body = Json(ErrorResponse::new(self.to_string()));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the transit cache.
pub type Result<T> = std::result::Result<T, CacheError>;
