//! Error handling for the backend API

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use exercise_core::{CatalogError, ExerciseError};
use serde::Serialize;
use thiserror::Error;

/// API error types
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Exercise(#[from] ExerciseError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        Self::Exercise(err.into())
    }
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Exercise(err) => match err {
                ExerciseError::NotFound { .. } => (StatusCode::NOT_FOUND, "not_found"),
                ExerciseError::InvalidAnswerShape(_) => {
                    (StatusCode::UNPROCESSABLE_ENTITY, "invalid_answer")
                }
                ExerciseError::Validation(_) => {
                    (StatusCode::UNPROCESSABLE_ENTITY, "validation_error")
                }
                ExerciseError::InsufficientChoices { .. } => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "insufficient_choices")
                }
                ExerciseError::AudioTooLong { .. } => {
                    (StatusCode::PAYLOAD_TOO_LARGE, "audio_too_long")
                }
                ExerciseError::UnsupportedAudioFormat(_) => (
                    StatusCode::UNSUPPORTED_MEDIA_TYPE,
                    "unsupported_audio_format",
                ),
                ExerciseError::TranscriptionFailed(_) => {
                    (StatusCode::UNPROCESSABLE_ENTITY, "transcription_failed")
                }
                ExerciseError::TranscriptionServiceUnavailable(_) => {
                    (StatusCode::SERVICE_UNAVAILABLE, "transcription_unavailable")
                }
                ExerciseError::Catalog(CatalogError::Duplicate { .. }) => {
                    (StatusCode::CONFLICT, "duplicate")
                }
                ExerciseError::Catalog(CatalogError::Storage(_)) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "storage_error")
                }
            },
            ApiError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "database_error"),
            ApiError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "unauthorized"),
            ApiError::Forbidden(_) => (StatusCode::FORBIDDEN, "forbidden"),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type) = self.status_and_code();

        // Stored data that breaks a creation invariant means validation was bypassed.
        if let ApiError::Exercise(ExerciseError::InsufficientChoices { .. }) = &self {
            tracing::error!(error = %self, "exercise data violates creation invariants");
        } else if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let body = Json(ErrorResponse {
            error: error_type.to_string(),
            message: self.to_string(),
        });

        (status, body).into_response()
    }
}

/// Result type alias for API operations
pub type Result<T> = std::result::Result<T, ApiError>;
