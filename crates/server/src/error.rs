// crates/server/src/error.rs
use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use stemsplit_core::{InputError, RunError};
use thiserror::Error;

use crate::jobs::OrchestrateError;

/// Structured JSON error response for API errors
#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
        }
    }

    pub fn with_details(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: Some(details.into()),
        }
    }
}

/// API error types that map to HTTP status codes
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Input(#[from] InputError),

    #[error(transparent)]
    Run(#[from] RunError),

    #[error(transparent)]
    Orchestrate(OrchestrateError),

    #[error("Invalid request body: {0}")]
    InvalidBody(String),

    #[error("Job not found: {0}")]
    JobNotFound(crate::jobs::JobId),
}

impl From<OrchestrateError> for ApiError {
    fn from(err: OrchestrateError) -> Self {
        match err {
            OrchestrateError::Input(e) => ApiError::Input(e),
            OrchestrateError::Run(e) => ApiError::Run(e),
            other => ApiError::Orchestrate(other),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::InvalidBody(rejection.body_text())
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Input(_) | ApiError::InvalidBody(_) => StatusCode::BAD_REQUEST,
            ApiError::Orchestrate(OrchestrateError::TrackName { .. }) => StatusCode::BAD_REQUEST,
            ApiError::JobNotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Run(_) | ApiError::Orchestrate(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error_response = match &self {
            ApiError::Input(e) => {
                tracing::warn!(error = %e, "Rejected input file");
                ErrorResponse::new(e.to_string())
            }
            ApiError::InvalidBody(msg) => {
                tracing::warn!(message = %msg, "Malformed request body");
                ErrorResponse::new(self.to_string())
            }
            ApiError::JobNotFound(id) => {
                tracing::debug!(job_id = id, "Job not found");
                ErrorResponse::new(self.to_string())
            }
            ApiError::Run(e) => {
                tracing::error!(error = %e, exit_code = ?e.exit_code(), "Separation failed");
                match e {
                    RunError::Spawn { program, .. } => ErrorResponse::with_details(
                        e.to_string(),
                        format!("Is '{program}' installed and on PATH?"),
                    ),
                    _ => ErrorResponse::new(e.to_string()),
                }
            }
            ApiError::Orchestrate(e) => {
                if status.is_client_error() {
                    tracing::warn!(error = %e, "Rejected separation request");
                } else {
                    tracing::error!(error = %e, "Separation failed");
                }
                ErrorResponse::new(e.to_string())
            }
        };

        (status, Json(error_response)).into_response()
    }
}

/// Result type alias for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
