//! API error types and responses

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::keys::IssuerError;
use crate::storage::StorageError;

/// API error type
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Invalid publisher: {0}")]
    InvalidPublisher(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("External id already registered: {0}")]
    Conflict(String),

    #[error("Invalid nonce: {0}")]
    InvalidNonce(String),

    #[error("Session expired: {0}")]
    Expired(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// API error response body
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::InvalidPublisher(_) => (StatusCode::BAD_REQUEST, "INVALID_PUBLISHER"),
            ApiError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            ApiError::Conflict(_) => (StatusCode::CONFLICT, "ALREADY_REGISTERED"),
            ApiError::InvalidNonce(_) => (StatusCode::BAD_REQUEST, "INVALID_NONCE"),
            ApiError::Expired(_) => (StatusCode::GONE, "SESSION_EXPIRED"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };

        let body = ErrorResponse {
            error: self.to_string(),
            code: code.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::AlreadyExists(id) => ApiError::Conflict(id),
            StorageError::NotFound(what) => ApiError::InvalidNonce(format!("unknown {}", what)),
            StorageError::AlreadyConsumed(capture_id) => {
                ApiError::InvalidNonce(format!("already redeemed for {}", capture_id))
            }
            StorageError::WrongDevice => ApiError::InvalidNonce(err.to_string()),
            StorageError::Expired(capture_id) => ApiError::Expired(capture_id),
            StorageError::Backend(msg) => ApiError::Internal(msg),
        }
    }
}

impl From<IssuerError> for ApiError {
    fn from(err: IssuerError) -> Self {
        ApiError::Internal(err.to_string())
    }
}
