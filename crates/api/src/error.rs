use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use wflens_core::error::CoreError;

/// Message shown when a file carries no recoverable workflow.
pub const NO_WORKFLOW_MESSAGE: &str = "No workflow found in this file";

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors and adds HTTP-specific variants.
/// Implements [`IntoResponse`] to produce consistent JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `wflens_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The upload was readable but held no workflow.
    #[error("No workflow found in this file")]
    NoWorkflow,

    /// A lookup by id found nothing.
    #[error("{entity} '{id}' not found")]
    NotFound { entity: &'static str, id: String },

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            // --- CoreError variants ---
            AppError::Core(core) => match core {
                CoreError::MalformedInput(msg) => {
                    (StatusCode::BAD_REQUEST, "MALFORMED_INPUT", msg.clone())
                }
                CoreError::UnsupportedMedia(msg) => (
                    StatusCode::UNSUPPORTED_MEDIA_TYPE,
                    "UNSUPPORTED_MEDIA_TYPE",
                    msg.clone(),
                ),
                CoreError::Catalog(msg) | CoreError::Internal(msg) => {
                    tracing::error!(error = %msg, "Internal core error");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "INTERNAL_ERROR",
                        "An internal error occurred".to_string(),
                    )
                }
            },

            // --- HTTP-specific errors ---
            AppError::NoWorkflow => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "NO_WORKFLOW",
                NO_WORKFLOW_MESSAGE.to_string(),
            ),
            AppError::NotFound { .. } => (StatusCode::NOT_FOUND, "NOT_FOUND", self.to_string()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_workflow_is_unprocessable() {
        let response = AppError::NoWorkflow.into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn unsupported_media_maps_to_415() {
        let response =
            AppError::Core(CoreError::UnsupportedMedia("text/plain".into())).into_response();
        assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    }

    #[test]
    fn internal_errors_are_opaque() {
        let response = AppError::Core(CoreError::Internal("disk full".into())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
