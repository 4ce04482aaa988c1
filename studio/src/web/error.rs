//! Error responses

use axum::{extract::rejection::JsonRejection, http::StatusCode, Json};
use serde::Serialize;

use crate::error::StudioError;

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(msg: impl Into<String>) -> Self {
        Self { error: msg.into() }
    }
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

pub type ApiResult<T> = Result<Json<T>, ApiError>;

/// Map a domain error onto its HTTP status
pub fn api_error(err: StudioError) -> ApiError {
    let status = match &err {
        StudioError::NotFound(_) => StatusCode::NOT_FOUND,
        StudioError::Conflict(_) | StudioError::Validation(_) => StatusCode::BAD_REQUEST,
        StudioError::Upstream(_) => StatusCode::BAD_GATEWAY,
        StudioError::Export(_) | StudioError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status.is_server_error() {
        tracing::error!("Request failed: {}", err);
    } else {
        tracing::debug!("Request rejected ({}): {}", status, err);
    }

    (status, Json(ErrorResponse::new(err.to_string())))
}

/// Malformed or mistyped JSON bodies are rejected with 400
pub fn bad_payload(rejection: JsonRejection) -> ApiError {
    tracing::debug!("Rejected request body: {}", rejection.body_text());
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse::new(rejection.body_text())),
    )
}
