//! JSON error responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use stockbook_core::posting::{ErrorKind, PostingError};
use tracing::error;

/// Error returned by API handlers.
#[derive(Debug)]
pub enum ApiError {
    /// A posting failure from the core or the store.
    Posting(PostingError),
    /// A malformed request the core never saw.
    BadRequest {
        /// Machine-readable code.
        code: &'static str,
        /// Human-readable message.
        message: String,
    },
}

impl ApiError {
    /// Creates a bad request error.
    pub fn bad_request(code: &'static str, message: impl Into<String>) -> Self {
        Self::BadRequest {
            code,
            message: message.into(),
        }
    }
}

impl From<PostingError> for ApiError {
    fn from(err: PostingError) -> Self {
        Self::Posting(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::Posting(err) => {
                if err.kind() == ErrorKind::Persistence {
                    error!(error = %err, "Posting failed in the store");
                }

                let status = StatusCode::from_u16(err.http_status_code())
                    .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

                (
                    status,
                    Json(json!({
                        "error": err.error_code(),
                        "message": err.to_string(),
                    })),
                )
                    .into_response()
            }
            Self::BadRequest { code, message } => (
                StatusCode::BAD_REQUEST,
                Json(json!({
                    "error": code,
                    "message": message,
                })),
            )
                .into_response(),
        }
    }
}
