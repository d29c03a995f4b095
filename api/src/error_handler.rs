use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use contextor::InputError;
use thiserror::Error;

use crate::core::http::response_envelope::{ApiErrorDetail, ApiResponse};

/// Public application error type.
#[derive(Debug, Error)]
pub enum AppError {
    // --- IO / server ---
    #[error("failed to bind listener on {addr}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server error")]
    Server(#[source] std::io::Error),

    // --- Request ---
    #[error("bad request: {0}")]
    BadRequest(String),

    /// A single request field failed validation.
    #[error("invalid {field}: {message}")]
    InvalidField {
        field: &'static str,
        message: String,
    },

    #[error(transparent)]
    Input(#[from] InputError),

    #[error("session '{0}' not found")]
    SessionNotFound(String),
}

impl AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) | AppError::InvalidField { .. } | AppError::Input(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::SessionNotFound(_) => StatusCode::NOT_FOUND,
            AppError::Bind { .. } | AppError::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            AppError::Bind { .. } => "BIND_ERROR",
            AppError::Server(_) => "SERVER_ERROR",
            AppError::BadRequest(_) => "BAD_REQUEST",
            AppError::InvalidField { .. } => "INVALID_FIELD",
            AppError::Input(_) => "INVALID_INPUT",
            AppError::SessionNotFound(_) => "NOT_FOUND",
        }
    }

    fn details(&self) -> Vec<ApiErrorDetail> {
        let detail = ApiErrorDetail::field;
        match self {
            AppError::InvalidField { field, .. } => vec![detail(*field, None)],
            AppError::Input(InputError::Empty) => vec![detail(
                "text",
                Some("Send non-empty `text`, an `image_base64`, or both."),
            )],
            AppError::Input(InputError::TopKOutOfRange { .. }) => vec![detail("top_k", None)],
            _ => Vec::new(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        ApiResponse::<()>::error(self.error_code(), self.to_string(), self.details())
            .into_response_with_status(status)
    }
}

/// Handy result alias used across handlers.
pub type AppResult<T> = Result<T, AppError>;

impl From<JsonRejection> for AppError {
    fn from(err: JsonRejection) -> Self {
        AppError::BadRequest(err.body_text())
    }
}
