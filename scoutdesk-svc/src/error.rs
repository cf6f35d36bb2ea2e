//! HTTP error mapping
//!
//! Service errors keep their kind; the status code is derived from it:
//! Auth 403, Validation 422, NotFound 404, Conflict 409, everything else 500.
//! A missing or unknown session is 401.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use scoutdesk_common::Error as CommonError;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// No valid session (401)
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    /// Malformed request outside service validation (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Service error
    #[error(transparent)]
    Service(#[from] CommonError),
}

/// Result type for handlers
pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Service(err) => match err {
                CommonError::Auth(_) => StatusCode::FORBIDDEN,
                CommonError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
                CommonError::NotFound(_) => StatusCode::NOT_FOUND,
                CommonError::Conflict(_) => StatusCode::CONFLICT,
                CommonError::Storage(_) | CommonError::Io(_) | CommonError::Config(_) | CommonError::Internal(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Unauthenticated(_) => "AuthError",
            ApiError::BadRequest(_) => "BadRequest",
            ApiError::Service(err) => err.kind(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "Request failed");
        }

        let body = Json(json!({
            "error": {
                "code": self.code(),
                "message": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}
