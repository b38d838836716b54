use crate::firestore::FirestoreError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Errors returned by route handlers.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Unauthorized: {0}")]
    Unauthorized(&'static str),
    #[error("Firebase is not configured")]
    FirebaseUnavailable,
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error(transparent)]
    Store(#[from] FirestoreError),
}

/// Marks a response as an unhandled failure; the body is rendered by
/// [`render_internal_errors`](super::middleware::render_internal_errors).
#[derive(Debug, Clone)]
pub struct InternalError(pub String);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Unauthorized(reason) => (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "Unauthorized", "message": reason })),
            )
                .into_response(),
            ApiError::FirebaseUnavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "error": "Service unavailable",
                    "message": "Firebase is not configured on this server",
                })),
            )
                .into_response(),
            ApiError::NotFound(what) => (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": format!("{} not found", what) })),
            )
                .into_response(),
            ApiError::Store(err) => {
                let mut response = StatusCode::INTERNAL_SERVER_ERROR.into_response();
                response
                    .extensions_mut()
                    .insert(InternalError(err.to_string()));
                response
            }
        }
    }
}

/// The JSON body for an unhandled failure. The cause is only exposed in development.
pub fn internal_error_body(message: &str, development: bool) -> serde_json::Value {
    let message = if development {
        message
    } else {
        "An error occurred"
    };
    json!({ "error": "Internal server error", "message": message })
}
