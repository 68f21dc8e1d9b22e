//! Error handling for API endpoints

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use notifyd_core::CoreError;
use serde::Serialize;

/// API error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// API error type that can be converted to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Conflict(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, details) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "Not Found", Some(msg)),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "Bad Request", Some(msg)),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "Conflict", Some(msg)),
            ApiError::Internal(msg) => {
                tracing::error!("internal server error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error", None)
            }
        };

        let body = Json(ErrorResponse {
            error: error.to_string(),
            details,
        });

        (status, body).into_response()
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::NotFound(id) => ApiError::NotFound(format!("notification not found: {id}")),
            CoreError::IdempotencyConflict(key) => {
                ApiError::Conflict(format!("idempotency key already in use: {key}"))
            }
            CoreError::InvalidData(msg) => ApiError::BadRequest(msg),
            CoreError::DuplicateProvider(p) | CoreError::PlatformNotSupported(p) => {
                ApiError::Internal(format!("provider registry misconfigured for platform: {p}"))
            }
        }
    }
}

/// Convert sqlx errors to ApiError; unique-constraint violations surface
/// as 409 Conflict since the only one in this schema is the idempotency key.
impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => ApiError::NotFound("resource not found".to_string()),
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                ApiError::Conflict("idempotency key already in use".to_string())
            }
            _ => ApiError::Internal(format!("database error: {err}")),
        }
    }
}

impl From<notifyd_worker::error::WorkerError> for ApiError {
    fn from(err: notifyd_worker::error::WorkerError) -> Self {
        match err {
            notifyd_worker::error::WorkerError::IdempotencyConflict(key) => {
                ApiError::Conflict(format!("idempotency key already in use: {key}"))
            }
            notifyd_worker::error::WorkerError::Db(e) => e.into(),
        }
    }
}
