use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::validate::ValidationErrors;

/// Error taxonomy for the whole API surface. Everything a handler can fail
/// with is recovered into a structured JSON response here; only `Internal`
/// reaches the client as a generic 500.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Validation failed")]
    Validation(#[from] ValidationErrors),
    #[error("{0}")]
    BadRequest(&'static str),
    #[error("{0}")]
    Conflict(&'static str),
    #[error("Invalid credentials")]
    InvalidCredentials,
    // Bad, expired and missing tokens all land here; the distinction is
    // logged server-side but never rendered to the caller.
    #[error("{0}")]
    Unauthorized(&'static str),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("Invalid due_date format. Use YYYY-MM-DD")]
    InvalidDueDate,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<sqlx::Error> for ApiError {
    fn from(e: sqlx::Error) -> Self {
        Self::Internal(e.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            Self::Validation(errors) => (
                StatusCode::BAD_REQUEST,
                json!({ "error": "Validation failed", "messages": errors }),
            ),
            Self::BadRequest(message) => (StatusCode::BAD_REQUEST, json!({ "error": message })),
            Self::Conflict(message) => (StatusCode::CONFLICT, json!({ "error": message })),
            Self::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                json!({ "error": "Invalid credentials" }),
            ),
            Self::Unauthorized(message) => (
                StatusCode::UNAUTHORIZED,
                json!({ "error": "Unauthorized", "message": message }),
            ),
            Self::NotFound(what) => (
                StatusCode::NOT_FOUND,
                json!({ "error": format!("{what} not found") }),
            ),
            Self::InvalidDueDate => (
                StatusCode::BAD_REQUEST,
                json!({ "error": "Invalid due_date format. Use YYYY-MM-DD" }),
            ),
            Self::Internal(e) => {
                error!(error = %e, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Internal server error", "message": "Something went wrong" }),
                )
            }
        };
        (status, Json(body)).into_response()
    }
}
