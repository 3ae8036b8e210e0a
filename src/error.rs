//! Error types for the middleware
//!
//! Provides unified error handling using thiserror. Errors never cross the
//! public boundary as `Err`; they are folded into failure envelopes.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

// == Middleware Error Enum ==
/// Unified error type for the middleware.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MiddlewareError {
    /// Malformed caller input (entity id, filter or payload of the wrong type)
    #[error("Validation error: {0}")]
    Validation(String),

    /// The target entity could not be located
    #[error("Resolution error: {0}")]
    Resolution(String),

    /// Cache key construction failed
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Work callback or commit failed inside a transaction
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// Hard attempt ceiling or wall-clock deadline reached
    #[error("Retry limit exceeded after {attempts} attempts ({elapsed_ms}ms): {last_error}")]
    RetryLimitExceeded {
        attempts: u32,
        elapsed_ms: u64,
        last_error: String,
    },

    /// The document store collaborator failed
    #[error("Store error: {0}")]
    Store(String),

    /// The cache adapter failed
    #[error("Cache error: {0}")]
    Cache(String),

    /// A panic or other unexpected failure
    #[error("Internal error: {0}")]
    Internal(String),
}

// == Error Kind ==
/// Serializable discriminant carried in failure envelopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    ValidationError,
    ResolutionError,
    SerializationError,
    TransactionError,
    RetryLimitExceeded,
    StoreError,
    CacheError,
    InternalError,
}

impl MiddlewareError {
    /// Returns the serializable kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            MiddlewareError::Validation(_) => ErrorKind::ValidationError,
            MiddlewareError::Resolution(_) => ErrorKind::ResolutionError,
            MiddlewareError::Serialization(_) => ErrorKind::SerializationError,
            MiddlewareError::Transaction(_) => ErrorKind::TransactionError,
            MiddlewareError::RetryLimitExceeded { .. } => ErrorKind::RetryLimitExceeded,
            MiddlewareError::Store(_) => ErrorKind::StoreError,
            MiddlewareError::Cache(_) => ErrorKind::CacheError,
            MiddlewareError::Internal(_) => ErrorKind::InternalError,
        }
    }

    /// Renders the error as the `data` payload of a failure envelope.
    pub fn to_value(&self) -> serde_json::Value {
        json!({
            "kind": self.kind(),
            "message": self.to_string(),
        })
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for MiddlewareError {
    fn into_response(self) -> Response {
        let status = match &self {
            MiddlewareError::Validation(_) => StatusCode::BAD_REQUEST,
            MiddlewareError::Resolution(_) => StatusCode::NOT_FOUND,
            MiddlewareError::RetryLimitExceeded { .. } => StatusCode::SERVICE_UNAVAILABLE,
            MiddlewareError::Store(_) | MiddlewareError::Cache(_) => StatusCode::BAD_GATEWAY,
            MiddlewareError::Serialization(_)
            | MiddlewareError::Transaction(_)
            | MiddlewareError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(json!({ "error": self.to_value() }))).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the middleware.
pub type Result<T> = std::result::Result<T, MiddlewareError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_serializes_as_taxonomy_name() {
        let err = MiddlewareError::Validation("entity must be a string".to_string());
        let value = err.to_value();
        assert_eq!(value["kind"], "ValidationError");
        assert!(value["message"]
            .as_str()
            .unwrap()
            .contains("entity must be a string"));
    }

    #[test]
    fn test_retry_limit_message() {
        let err = MiddlewareError::RetryLimitExceeded {
            attempts: 10,
            elapsed_ms: 1200,
            last_error: "write conflict".to_string(),
        };
        assert_eq!(err.kind(), ErrorKind::RetryLimitExceeded);
        assert!(err.to_string().contains("10 attempts"));
    }

    #[test]
    fn test_into_response_status() {
        let response = MiddlewareError::Resolution("users".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = MiddlewareError::Validation("bad".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
