//! services/api/src/error.rs
//!
//! Defines the primary error type for the entire API service and its mapping
//! to HTTP responses. Every error reaching a client carries a short `message`
//! and, where one exists, a `detail` with downstream specifics; internal
//! paths and stack traces never leave the process.

use crate::config::ConfigError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use gendoc_core::ports::PortError;
use serde_json::json;

/// The primary error type for the `api` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Client input malformed or missing - always a 400.
    #[error("{0}")]
    Validation(String),

    /// No credential was supplied at all.
    #[error("Unauthorized")]
    Unauthorized,

    /// A credential was supplied but rejected.
    #[error("Invalid token")]
    Forbidden,

    /// Thin wrapper used by login to avoid disclosing which factor failed.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// The resource is absent, or not owned by the caller - the two are
    /// deliberately indistinguishable.
    #[error("{0}")]
    NotFound(String),

    /// A resource already exists (duplicate signup email).
    #[error("{0}")]
    Conflict(String),

    /// The uploaded file could not be read back from disk; nothing was sent
    /// downstream.
    #[error("Failed to read uploaded file")]
    FileRead(String),

    /// The doc-builder answered with a non-success status; its status code is
    /// forwarded and its body attached as `detail`.
    #[error("DocBuilder error")]
    Downstream { status: u16, body: String },

    /// The persistence layer failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Network or unexpected failure talking to the doc-builder.
    #[error("Generation failed")]
    Integration(String),

    /// Represents an error from the underlying database library.
    #[error("Database Error: {0}")]
    Database(#[from] sqlx::Error),

    /// Represents a standard Input/Output error (e.g., binding to a socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

impl From<PortError> for ApiError {
    fn from(err: PortError) -> Self {
        match err {
            PortError::NotFound(msg) => ApiError::NotFound(msg),
            PortError::Conflict(msg) => ApiError::Conflict(msg),
            PortError::Downstream { status, body } => ApiError::Downstream { status, body },
            PortError::Unexpected(msg) => ApiError::Storage(msg),
        }
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Downstream { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Downstream specifics safe to show the caller, if any.
    fn detail(&self) -> Option<String> {
        match self {
            ApiError::Downstream { body, .. } => Some(body.clone()),
            ApiError::Integration(msg) => Some(msg.clone()),
            _ => None,
        }
    }

    /// The short human-readable message for the response body. Internal
    /// variants are collapsed to a generic message here while the full error
    /// is logged at the call site.
    fn public_message(&self) -> String {
        match self {
            ApiError::Config(_)
            | ApiError::Database(_)
            | ApiError::Io(_)
            | ApiError::Internal(_)
            | ApiError::Storage(_) => "Server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self.detail() {
            Some(detail) => json!({ "message": self.public_message(), "detail": detail }),
            None => json!({ "message": self.public_message() }),
        };
        (status, Json(body)).into_response()
    }
}
