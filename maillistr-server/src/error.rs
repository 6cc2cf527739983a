//! Error types for the maillistr HTTP API
//!
//! Every JSON error body has the `{success: false, error}` shape used by the
//! rest of the API. Authentication failures carry no body.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Unknown list (404)
    #[error("{0}")]
    NotFound(String),

    /// Missing or wrong admin credential (403)
    #[error("Forbidden")]
    Forbidden,

    /// Malformed request (400)
    #[error("{0}")]
    BadRequest(String),

    /// maillistr-common error
    #[error(transparent)]
    Common(#[from] maillistr_common::Error),
}

impl ApiError {
    pub fn list_not_found() -> Self {
        ApiError::NotFound("List not found".to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Forbidden => return StatusCode::FORBIDDEN.into_response(),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Common(maillistr_common::Error::NotFound(msg)) => {
                (StatusCode::NOT_FOUND, format!("Not found: {}", msg))
            }
            ApiError::Common(maillistr_common::Error::InvalidInput(msg)) => {
                (StatusCode::BAD_REQUEST, msg)
            }
            ApiError::Common(err) => {
                tracing::error!(error = %err, "Request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
            }
        };

        let body = Json(json!({
            "success": false,
            "error": message,
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
