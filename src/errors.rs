use axum::{
    response::{IntoResponse, Response},
    http::StatusCode,
    Json
};
use thiserror::Error;
use tracing::error;

/// Operational errors surfaced by the API handlers.
///
/// Each variant carries the user-facing message; the HTTP status is decided
/// by the `IntoResponse` impl. Handlers return `Result<_, ApiError>`, so any
/// failure halts the handler and is rendered by this one code path.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Database error: {0}")]
    Database(#[from] anyhow::Error),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unauthorized(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Database(err) => {
                // Log the cause, hand the client a generic message
                error!(?err, "request failed with a database error");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
        };

        // 4xx are client failures, 5xx are server errors
        let kind = if status.is_client_error() { "fail" } else { "error" };

        let body = Json(serde_json::json!({
            "status": kind,
            "message": message
        }));

        (status, body).into_response()
    }
}
