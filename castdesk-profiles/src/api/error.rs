//! API error responses

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
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Reconciler or datastore error
    #[error(transparent)]
    Common(#[from] castdesk_common::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        use castdesk_common::Error;

        let (status, error_code) = match &self {
            ApiError::NotFound(_) | ApiError::Common(Error::NotFound(_)) => {
                (StatusCode::NOT_FOUND, "NOT_FOUND")
            }
            ApiError::Common(Error::MalformedPayload(_)) => {
                (StatusCode::BAD_REQUEST, "MALFORMED_PAYLOAD")
            }
            ApiError::Common(Error::AlreadyExists(_)) => (StatusCode::CONFLICT, "CONFLICT"),
            ApiError::Common(Error::Config(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "CONFIG_ERROR")
            }
            ApiError::Common(_) => (StatusCode::INTERNAL_SERVER_ERROR, "PERSISTENCE_FAILURE"),
        };

        if status.is_server_error() {
            tracing::error!("{} {}: {}", status, error_code, self);
        }

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}
