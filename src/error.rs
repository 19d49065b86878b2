//! Error types for the query cache and the services built on it
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Cache Error Enum ==
/// Errors raised by the cache itself.
///
/// Failures of the wrapped read functions are never converted into this type;
/// they reach callers unchanged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// Parameters could not be turned into a canonical key
    #[error("Cannot generate cache key for {function}: {reason}")]
    KeyGeneration { function: String, reason: String },

    /// Invalidation pattern is not a valid regular expression
    #[error("Invalid invalidation pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// Key holds a value of a different type than the one requested
    #[error("Cached value for '{0}' has an unexpected type")]
    TypeMismatch(String),

    /// Underlying read task ended without producing a result
    #[error("Read for '{0}' was aborted before it settled")]
    ReadAborted(String),
}

// == Service Error Enum ==
/// Errors surfaced by the profile service and the HTTP layer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// Requested record does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Backing store reported a failure
    #[error("Backend error: {0}")]
    Backend(String),

    /// Cache layer error
    #[error(transparent)]
    Cache(#[from] CacheError),
}

// == IntoResponse Implementation ==
impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = match &self {
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ServiceError::Backend(_) => StatusCode::BAD_GATEWAY,
            ServiceError::Cache(CacheError::InvalidPattern { .. })
            | ServiceError::Cache(CacheError::KeyGeneration { .. }) => StatusCode::BAD_REQUEST,
            ServiceError::Cache(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (ServiceError::NotFound("u1".into()), StatusCode::NOT_FOUND),
            (ServiceError::InvalidRequest("bad".into()), StatusCode::BAD_REQUEST),
            (ServiceError::Backend("down".into()), StatusCode::BAD_GATEWAY),
            (
                ServiceError::Cache(CacheError::InvalidPattern {
                    pattern: "(".into(),
                    reason: "unclosed group".into(),
                }),
                StatusCode::BAD_REQUEST,
            ),
            (
                ServiceError::Cache(CacheError::ReadAborted("k".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }

    #[test]
    fn test_cache_error_is_transparent() {
        let err: ServiceError = CacheError::TypeMismatch("k".into()).into();
        assert_eq!(err.to_string(), "Cached value for 'k' has an unexpected type");
    }
}
