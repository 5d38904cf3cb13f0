// Error taxonomy for the generation pipeline and its HTTP boundary.
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use thiserror::Error;
use tracing::{error, warn};

/// Everything that can go wrong between a mood input and a stored playlist.
///
/// The generation-path kinds (`Configuration`, `Upstream`, `EmptyGeneration`,
/// `MalformedOutput`, `InsufficientSongs`) all collapse to the same generic
/// "try again" response; their diagnostic payload is logged, never sent to
/// the client.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("missing configuration: {0}")]
    Configuration(&'static str),

    #[error("upstream request failed: {0}")]
    Upstream(String),

    #[error("backend returned no usable content")]
    EmptyGeneration,

    #[error("backend output could not be parsed: {reason}")]
    MalformedOutput { reason: String, raw: String },

    #[error("only {valid} usable songs, need at least {min}")]
    InsufficientSongs { valid: usize, min: usize },

    #[error("{0}")]
    Authorization(&'static str),

    #[error("invalid request: {0}")]
    InvalidRequest(&'static str),

    #[error("not found: {0}")]
    NotFound(&'static str),

    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),
}

const TRY_AGAIN: &str = "something went wrong. try again.";

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::Configuration(key) => {
                error!(kind = "configuration", missing = key, "generation failed");
                (StatusCode::INTERNAL_SERVER_ERROR, TRY_AGAIN)
            }
            ApiError::Upstream(detail) => {
                error!(kind = "upstream", detail = %detail, "generation failed");
                (StatusCode::BAD_GATEWAY, TRY_AGAIN)
            }
            ApiError::EmptyGeneration => {
                error!(kind = "empty_generation", "generation failed");
                (StatusCode::BAD_GATEWAY, TRY_AGAIN)
            }
            ApiError::MalformedOutput { reason, raw } => {
                // Raw payload goes to the log for operator inspection only.
                error!(kind = "malformed_output", reason = %reason, raw = %raw, "generation failed");
                (StatusCode::BAD_GATEWAY, TRY_AGAIN)
            }
            ApiError::InsufficientSongs { valid, min } => {
                error!(kind = "insufficient_songs", valid, min, "generation failed");
                (StatusCode::BAD_GATEWAY, TRY_AGAIN)
            }
            ApiError::Authorization(message) => {
                warn!(kind = "authorization", message = *message, "request rejected");
                (StatusCode::UNAUTHORIZED, *message)
            }
            ApiError::InvalidRequest(message) => (StatusCode::BAD_REQUEST, *message),
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, *message),
            ApiError::Storage(e) => {
                error!(kind = "storage", error = %e, "database operation failed");
                (StatusCode::INTERNAL_SERVER_ERROR, TRY_AGAIN)
            }
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}
