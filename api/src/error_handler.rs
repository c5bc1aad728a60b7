use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use pr_reviewer::{JournalError, ReviewError};
use thiserror::Error;

use crate::core::http::response_envelope::{ApiErrorDetail, ApiResponse};

/// Public application error type.
#[derive(Debug, Error)]
pub enum AppError {
    // --- Boot / config ---
    #[error("missing required environment variable: {0}")]
    MissingEnv(&'static str),

    #[error(transparent)]
    Reviewer(#[from] ReviewError),

    // --- IO / network / server ---
    #[error("failed to bind listener")]
    Bind(#[source] std::io::Error),

    #[error("server error")]
    Server(#[source] std::io::Error),

    // --- Request / routing ---
    #[error("bad request: {message}")]
    BadRequest {
        message: String,
        details: Vec<ApiErrorDetail>,
    },

    #[error("invalid trigger secret")]
    Unauthorized,

    #[error("trigger secret is not configured")]
    SecretNotConfigured,
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        AppError::BadRequest {
            message: message.into(),
            details: Vec::new(),
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Reviewer(ReviewError::Journal(JournalError::ConflictingEvent(_))) => {
                StatusCode::CONFLICT
            }
            AppError::Reviewer(e) if e.is_retryable() => StatusCode::SERVICE_UNAVAILABLE,
            AppError::MissingEnv(_)
            | AppError::Reviewer(_)
            | AppError::Bind(_)
            | AppError::Server(_)
            | AppError::SecretNotConfigured => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            AppError::MissingEnv(_) => "MISSING_ENV",
            AppError::Reviewer(ReviewError::Journal(JournalError::ConflictingEvent(_))) => {
                "INSTANCE_CONFLICT"
            }
            AppError::Reviewer(_) => "SCHEDULE_FAILED",
            AppError::Bind(_) => "BIND_ERROR",
            AppError::Server(_) => "SERVER_ERROR",
            AppError::BadRequest { .. } => "BAD_REQUEST",
            AppError::Unauthorized => "UNAUTHORIZED",
            AppError::SecretNotConfigured => "SERVER_CONFIG_ERROR",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.error_code();
        let message = self.to_string();
        let details = match self {
            AppError::BadRequest { details, .. } => details,
            AppError::Unauthorized => vec![ApiErrorDetail::field(
                "secret",
                "Secret does not match the configured trigger secret.",
            )],
            AppError::SecretNotConfigured => vec![ApiErrorDetail::field(
                "secret",
                "Set TRIGGER_SECRET on the server.",
            )],
            AppError::Reviewer(ReviewError::Journal(JournalError::ConflictingEvent(_))) => {
                vec![ApiErrorDetail::field(
                    "id",
                    "Reuse an id only to redeliver the same event.",
                )]
            }
            _ => Vec::new(),
        };
        ApiResponse::<()>::error(code, message, details).into_response_with_status(status)
    }
}

/// Handy result alias used across handlers.
pub type AppResult<T> = Result<T, AppError>;

impl From<axum::extract::rejection::JsonRejection> for AppError {
    fn from(err: axum::extract::rejection::JsonRejection) -> Self {
        AppError::bad_request(err.body_text())
    }
}
