use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use playground_core::error::{CoreError, FieldError};
use playground_db::StoreError;

use crate::response::ApiResponse;

/// Message returned for every fault whose cause must not leak to the caller.
const INTERNAL_MESSAGE: &str = "An internal error occurred";

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors and [`StoreError`] for persistence,
/// and renders both into the standard [`ApiResponse`] envelope.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `playground_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A storage error from `playground_db`.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A malformed request (unparseable body, query string, or path).
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// An internal error with a human-readable message (logged, never returned).
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn unauthorized(message: impl Into<String>) -> Self {
        AppError::Core(CoreError::Unauthorized(message.into()))
    }

    /// The uniform not-found error for owner-scoped session lookups.
    pub fn session_not_found() -> Self {
        AppError::Core(CoreError::NotFound { entity: "Session" })
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message, errors) = match self {
            AppError::Core(core) => match core {
                CoreError::NotFound { entity } => {
                    (StatusCode::NOT_FOUND, format!("{entity} not found"), None)
                }
                CoreError::Validation(errors) => (
                    StatusCode::BAD_REQUEST,
                    validation_message(&errors),
                    Some(errors),
                ),
                CoreError::Conflict(msg) => (StatusCode::CONFLICT, msg, None),
                CoreError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg, None),
            },

            AppError::Store(StoreError::Conflict(msg)) => (StatusCode::CONFLICT, msg, None),
            AppError::Store(StoreError::Database(err)) => {
                tracing::error!(error = %err, "Database error");
                (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_MESSAGE.into(), None)
            }

            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, None),
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_MESSAGE.into(), None)
            }
        };

        (status, Json(ApiResponse::failure(message, errors))).into_response()
    }
}

/// A single violation is reported by its own message; several collapse to a
/// generic headline with the details in `errors`.
fn validation_message(errors: &[FieldError]) -> String {
    match errors {
        [only] => only.message.clone(),
        _ => "Validation failed".to_string(),
    }
}
