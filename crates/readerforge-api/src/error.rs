//! Maps the API boundary's own errors to HTTP status codes, the one place
//! (per spec.md §7's propagation policy) that decides a status code rather
//! than propagating one from library code.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("request body failed validation: {0}")]
    BadRequest(String),

    #[error("{resource} not found")]
    NotFound { resource: String },

    #[error("resource is locked by another in-flight request: {0}")]
    Locked(String),

    #[error("internal error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    error: String,
    details: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::BadRequest(detail) => (StatusCode::BAD_REQUEST, detail.clone()),
            Self::NotFound { resource } => (StatusCode::NOT_FOUND, format!("{resource} not found")),
            Self::Locked(detail) => (StatusCode::CONFLICT, detail.clone()),
            Self::Internal(detail) => (StatusCode::INTERNAL_SERVER_ERROR, detail.clone()),
        };

        let body = ErrorBody {
            success: false,
            error: message,
            details: None,
        };

        (status, Json(body)).into_response()
    }
}
