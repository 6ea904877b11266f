use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use waymark_core::CoreError;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ServerError::Core(core) => match core {
                CoreError::NotFound(_) => (StatusCode::NOT_FOUND, core.to_string()),
                CoreError::Forbidden(_) => (StatusCode::FORBIDDEN, core.to_string()),
                CoreError::Conflict(_) => (StatusCode::CONFLICT, core.to_string()),
                CoreError::InvalidInput(_) => (StatusCode::BAD_REQUEST, core.to_string()),
                CoreError::Unauthenticated(_) => (StatusCode::UNAUTHORIZED, core.to_string()),
                CoreError::Store(_) | CoreError::BlobStorage(_) => {
                    // Internal detail is logged, not leaked.
                    tracing::error!(error = %core, "core operation failed");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "Internal server error".to_string(),
                    )
                }
            },
            ServerError::Unauthenticated(_) => (StatusCode::UNAUTHORIZED, self.to_string()),
            ServerError::BadRequest(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            ServerError::Internal(_) => {
                tracing::error!(error = %self, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = serde_json::json!({
            "error": message,
        });

        (status, axum::Json(body)).into_response()
    }
}
