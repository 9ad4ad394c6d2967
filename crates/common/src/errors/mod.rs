//! Error types for Swai services
//!
//! Provides a typed error hierarchy with:
//! - Distinct variants for bad identifiers, malformed upstream data and
//!   upstream availability failures
//! - HTTP status code mapping
//! - Structured error responses
//! - Error codes for client handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Error codes for machine-readable error identification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors (1xxx)
    ValidationError,

    // Resource errors (4xxx)
    NotFound,

    // External service errors (8xxx)
    MalformedReference,
    UpstreamTimeout,
    UpstreamUnavailable,
    UpstreamError,
    AssistantError,

    // Internal errors (9xxx)
    InternalError,
    ConfigurationError,
}

impl ErrorCode {
    /// Get the numeric code for this error
    pub fn as_code(&self) -> u16 {
        match self {
            ErrorCode::ValidationError => 1001,

            ErrorCode::NotFound => 4001,

            ErrorCode::MalformedReference => 8001,
            ErrorCode::UpstreamTimeout => 8002,
            ErrorCode::UpstreamUnavailable => 8003,
            ErrorCode::UpstreamError => 8004,
            ErrorCode::AssistantError => 8005,

            ErrorCode::InternalError => 9001,
            ErrorCode::ConfigurationError => 9002,
        }
    }
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Validation errors
    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    // Resource errors
    #[error("Unknown {resource_type} id: {id}")]
    NotFound { resource_type: String, id: String },

    // Upstream data contract violations
    #[error("Cannot find resource id in reference '{reference}': {reason}")]
    MalformedReference { reference: String, reason: String },

    // Transient upstream failures
    #[error("Upstream call timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Upstream unavailable: {message}")]
    UpstreamUnavailable { message: String },

    #[error("Unexpected upstream response ({status}): {message}")]
    UpstreamResponse { status: u16, message: String },

    // Question answering passthrough
    #[error("Assistant error: {message}")]
    Assistant { message: String },

    // Internal errors
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Internal server error: {message}")]
    Internal { message: String },
}

impl AppError {
    /// Shorthand for a missing upstream resource
    pub fn not_found(resource_type: &str, id: impl ToString) -> Self {
        AppError::NotFound {
            resource_type: resource_type.to_string(),
            id: id.to_string(),
        }
    }

    /// Shorthand for an elapsed per-call timeout
    pub fn timeout(after: Duration) -> Self {
        AppError::Timeout {
            timeout_ms: after.as_millis() as u64,
        }
    }

    /// Get the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Validation { .. } => ErrorCode::ValidationError,
            AppError::NotFound { .. } => ErrorCode::NotFound,
            AppError::MalformedReference { .. } => ErrorCode::MalformedReference,
            AppError::Timeout { .. } => ErrorCode::UpstreamTimeout,
            AppError::UpstreamUnavailable { .. } => ErrorCode::UpstreamUnavailable,
            AppError::UpstreamResponse { .. } => ErrorCode::UpstreamError,
            AppError::Assistant { .. } => ErrorCode::AssistantError,
            AppError::Configuration { .. } => ErrorCode::ConfigurationError,
            AppError::Internal { .. } => ErrorCode::InternalError,
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 400 Bad Request
            AppError::Validation { .. } => StatusCode::BAD_REQUEST,

            // 404 Not Found
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,

            // 502 Bad Gateway
            AppError::MalformedReference { .. }
            | AppError::UpstreamResponse { .. }
            | AppError::Assistant { .. } => StatusCode::BAD_GATEWAY,

            // 503 Service Unavailable
            AppError::UpstreamUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,

            // 504 Gateway Timeout
            AppError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,

            // 500 Internal Server Error
            AppError::Configuration { .. } | AppError::Internal { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Transient failures a caller may retry; the core never retries itself
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AppError::Timeout { .. } | AppError::UpstreamUnavailable { .. }
        )
    }

    /// Check if this error should be logged at error level
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }

    /// Check if this error is a client error
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }
}

/// Structured error response for API
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetails,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub code: ErrorCode,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();
        let message = self.to_string();

        // Log based on severity
        if self.is_server_error() {
            tracing::error!(
                error = %message,
                code = ?code,
                status = status.as_u16(),
                "Server error"
            );
        } else if self.is_client_error() {
            tracing::warn!(
                error = %message,
                code = ?code,
                status = status.as_u16(),
                "Client error"
            );
        }

        let body = ErrorResponse {
            error: ErrorDetails { code, message },
        };

        (status, Json(body)).into_response()
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            // reqwest does not carry the elapsed budget; callers that know it use AppError::timeout
            AppError::Timeout { timeout_ms: 0 }
        } else if err.is_connect() || err.is_request() {
            AppError::UpstreamUnavailable {
                message: err.to_string(),
            }
        } else if err.is_decode() {
            AppError::UpstreamResponse {
                status: err.status().map(|s| s.as_u16()).unwrap_or(200),
                message: format!("Failed to decode response: {}", err),
            }
        } else {
            AppError::UpstreamResponse {
                status: err.status().map(|s| s.as_u16()).unwrap_or(0),
                message: err.to_string(),
            }
        }
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Configuration {
            message: err.to_string(),
        }
    }
}
