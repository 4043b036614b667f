//! Error taxonomy shared by the registry and the transport layer.
//!
//! Every command failure falls into one of three categories: a lookup miss,
//! invalid input, or an external storage failure. None of them is fatal to
//! the process; a failed command leaves the registry untouched.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// Errors surfaced to the requesting client.
#[derive(Debug)]
pub enum ApiError {
    /// Unknown project id or revision index.
    NotFound(String),
    /// Rejected input (empty name/author/text, bad coordinates, bad filename).
    Validation(String),
    /// External storage failure (image or snapshot persistence).
    Storage(String),
}

impl ApiError {
    /// Stable machine-readable code, used in HTTP bodies and WebSocket frames.
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::NotFound(_) => "not_found",
            ApiError::Validation(_) => "validation",
            ApiError::Storage(_) => "storage",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::NotFound(what) => write!(f, "{} not found", what),
            ApiError::Validation(msg) => write!(f, "{}", msg),
            ApiError::Storage(msg) => write!(f, "Storage error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

/// JSON error body returned over HTTP.
#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.code(),
            message: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}
