use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use stream_core::StreamError;
use thiserror::Error;

/// API Error types
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unknown voice: {0}")]
    UnknownVoice(String),

    #[error("Synthesis error: {0}")]
    Synthesis(String),

    #[error("Internal server error: {0}")]
    InternalError(String),
}

impl From<StreamError> for ApiError {
    fn from(err: StreamError) -> Self {
        match err {
            StreamError::UnknownVoice(voice) => ApiError::UnknownVoice(voice),
            StreamError::Synthesis(msg) => ApiError::Synthesis(msg),
            StreamError::MalformedEvent(msg) => ApiError::InvalidInput(msg),
            StreamError::TransportWrite(msg) => ApiError::InternalError(msg),
        }
    }
}

/// Error response structure
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    code: u16,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            ApiError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::UnknownVoice(voice) => (
                StatusCode::NOT_FOUND,
                format!("Unknown voice: {voice}. Use /voices to list."),
            ),
            ApiError::Synthesis(msg) => {
                tracing::error!("Synthesis error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, format!("Synthesis error: {msg}"))
            }
            ApiError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = Json(ErrorResponse {
            error: error_message,
            code: status.as_u16(),
        });

        (status, body).into_response()
    }
}
