use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::error;

use warbler_store::StoreError;

/// HTTP-facing error: a status code plus a field-level message body.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn unauthorized(message: &str) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn not_found(what: &str) -> Self {
        Self::new(StatusCode::NOT_FOUND, format!("{what} not found"))
    }

    pub fn internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Validation(msg) => Self::new(StatusCode::BAD_REQUEST, msg),
            StoreError::Authorization(msg) => Self::new(StatusCode::FORBIDDEN, msg),
            StoreError::Conflict(msg) => Self::new(StatusCode::CONFLICT, msg),
            StoreError::NotFound(what) => Self::not_found(what),
            // Storage faults are logged, never surfaced in a body.
            StoreError::Storage(_) | StoreError::Internal(_) => {
                error!("store failure: {err}");
                Self::internal()
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}
