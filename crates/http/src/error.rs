//! Error handling for the shelf HTTP layer

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

/// Standard error response format for all HTTP errors
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    pub details: Vec<serde_json::Value>,
    pub trace_id: String,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

/// Application error types that map to HTTP responses
#[derive(Error, Debug)]
pub enum AppError {
    #[error("not found: {resource} '{id}'")]
    NotFound { resource: &'static str, id: String },

    #[error("bad request: {message}")]
    BadRequest { message: String },

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Create a not found error for a resource identifier
    pub fn not_found(resource: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            resource,
            id: id.into(),
        }
    }

    /// Create a bad request error
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            AppError::NotFound { .. } => "not_found",
            AppError::BadRequest { .. } => "bad_request",
            AppError::Internal(_) => "internal_error",
        }
    }

    fn body(&self, trace_id: Uuid) -> ErrorBody {
        let message = match self {
            AppError::NotFound { resource, id } => format!("{} '{}' not found", resource, id),
            AppError::BadRequest { message } => message.clone(),
            // Internal details stay in the logs for release builds
            AppError::Internal(_) if cfg!(not(debug_assertions)) => {
                "An internal server error occurred".to_string()
            }
            AppError::Internal(e) => format!("{:#}", e),
        };

        ErrorBody {
            code: self.code().to_string(),
            message,
            details: Vec::new(),
            trace_id: trace_id.to_string(),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let trace_id = Uuid::new_v4();
        let status = self.status();

        if status.is_server_error() {
            tracing::error!(
                error_id = %trace_id,
                error_code = self.code(),
                status_code = status.as_u16(),
                error = %format!("{:#}", self),
                "Request error"
            );
        } else {
            tracing::warn!(
                error_id = %trace_id,
                error_code = self.code(),
                status_code = status.as_u16(),
                "Request error"
            );
        }

        let envelope = ErrorEnvelope {
            error: self.body(trace_id),
        };

        (status, Json(envelope)).into_response()
    }
}
