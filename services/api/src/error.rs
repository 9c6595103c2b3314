//! services/api/src/error.rs
//!
//! Defines the startup error type for the API service and the error body
//! returned by HTTP handlers.

use crate::config::ConfigError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use study_aid_core::{PortError, StudyError};
use tracing::error;
use utoipa::ToSchema;

/// The primary error type for the `api` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error that propagated up from one of the core service ports.
    #[error("Service Port Error: {0}")]
    Port(#[from] PortError),

    /// Represents an error from the underlying database library.
    #[error("Database Error: {0}")]
    Database(#[from] sqlx::Error),

    /// Represents a failure while applying the embedded migrations.
    #[error("Migration Error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

/// The JSON body of every error response.
#[derive(Serialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
}

/// An error returned from an HTTP handler.
#[derive(Debug)]
pub struct HttpError {
    pub status: StatusCode,
    pub message: String,
}

impl HttpError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }
}

impl From<StudyError> for HttpError {
    fn from(err: StudyError) -> Self {
        let status = match &err {
            StudyError::Validation(_) => StatusCode::BAD_REQUEST,
            StudyError::Unauthorized => StatusCode::FORBIDDEN,
            StudyError::NotFound(_) => StatusCode::NOT_FOUND,
            StudyError::InvariantViolation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            StudyError::UpstreamGeneration(_) | StudyError::MalformedGeneration(_) => {
                StatusCode::BAD_GATEWAY
            }
            StudyError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!("Request failed: {}", err);
        }
        let message = match err {
            // Store details stay in the log.
            StudyError::Store(_) => "Internal server error".to_string(),
            other => other.to_string(),
        };
        Self { status, message }
    }
}

impl From<PortError> for HttpError {
    fn from(err: PortError) -> Self {
        StudyError::from(err).into()
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorBody { error: self.message })).into_response()
    }
}
