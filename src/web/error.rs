//! Web error types for the dotlog server.
//!
//! Errors are answered with a short plain-text body; the experiment client
//! and the browser listing both read these directly.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::store::{StoreError, ValidationError};

/// Error type for web API operations.
#[derive(Debug, thiserror::Error)]
pub enum WebError {
    /// Shared secret missing or wrong.
    #[error("Unauthorized")]
    Unauthorized,

    /// No shared secret configured server-side.
    #[error("Server API key not set")]
    ApiKeyNotSet,

    /// Bad request with validation error.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            WebError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
            WebError::ApiKeyNotSet => {
                tracing::error!("Request rejected: server API key not set");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Server API key not set".to_string(),
                )
            }
            WebError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            WebError::NotFound(_) => (StatusCode::NOT_FOUND, "Not found".to_string()),
            WebError::Internal(msg) => {
                tracing::error!("Internal server error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
        };

        (status, message).into_response()
    }
}

impl From<ValidationError> for WebError {
    fn from(err: ValidationError) -> Self {
        WebError::BadRequest(err.to_string())
    }
}

impl From<StoreError> for WebError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Validation(e) => e.into(),
            StoreError::NotFound(name) => WebError::NotFound(name),
            StoreError::PathTraversal(_) => WebError::BadRequest("Invalid file name".to_string()),
            StoreError::Io { .. } | StoreError::Serialize(_) => WebError::Internal(err.to_string()),
        }
    }
}

impl From<tokio::task::JoinError> for WebError {
    fn from(err: tokio::task::JoinError) -> Self {
        WebError::Internal(format!("Storage task failed: {}", err))
    }
}
