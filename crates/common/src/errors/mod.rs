//! Error types for PaperScout
//!
//! Provides:
//! - Distinct error kinds for input, lookup, upstream and internal failures
//! - HTTP status code mapping
//! - Structured error responses that never leak upstream detail
//! - Error codes for client handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Error codes for machine-readable error identification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors (1xxx)
    ValidationError,

    // Authentication errors (2xxx)
    Unauthorized,
    InvalidToken,
    ExpiredToken,

    // Resource errors (4xxx)
    PaperNotFound,
    InsufficientPapers,

    // Rate limiting (6xxx)
    RateLimited,

    // Database errors (7xxx)
    DatabaseError,
    ConnectionError,

    // External service errors (8xxx)
    FeedUnavailable,
    FeedTimeout,
    GenerationFailed,
    GenerationTimeout,

    // Internal errors (9xxx)
    InternalError,
    ConfigurationError,
    SerializationError,
}

impl ErrorCode {
    /// Get the numeric code for this error
    pub fn as_code(&self) -> u16 {
        match self {
            ErrorCode::ValidationError => 1001,

            ErrorCode::Unauthorized => 2001,
            ErrorCode::InvalidToken => 2002,
            ErrorCode::ExpiredToken => 2003,

            ErrorCode::PaperNotFound => 4002,
            ErrorCode::InsufficientPapers => 4003,

            ErrorCode::RateLimited => 6001,

            ErrorCode::DatabaseError => 7001,
            ErrorCode::ConnectionError => 7002,

            ErrorCode::FeedUnavailable => 8001,
            ErrorCode::FeedTimeout => 8002,
            ErrorCode::GenerationFailed => 8003,
            ErrorCode::GenerationTimeout => 8004,

            ErrorCode::InternalError => 9001,
            ErrorCode::ConfigurationError => 9002,
            ErrorCode::SerializationError => 9003,
        }
    }
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Input errors
    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    // Authentication errors
    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token expired")]
    ExpiredToken,

    // Resource errors
    #[error("Paper not found: {id}")]
    PaperNotFound { id: String },

    #[error("Not enough papers found: {found} of the required {required}")]
    InsufficientPapers { found: usize, required: usize },

    // Rate limiting
    #[error("Rate limit exceeded: {limit} requests per second")]
    RateLimited { limit: u32 },

    // Database errors
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Database connection error: {message}")]
    DatabaseConnection { message: String },

    // External service errors
    #[error("Literature feed error: {message}")]
    FeedUnavailable { message: String },

    #[error("Literature feed timeout after {timeout_ms}ms")]
    FeedTimeout { timeout_ms: u64 },

    #[error("Generation service error: {message}")]
    GenerationFailed { message: String },

    #[error("Generation timeout after {timeout_ms}ms")]
    GenerationTimeout { timeout_ms: u64 },

    // Internal errors
    #[error("Internal server error: {message}")]
    Internal { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Shorthand for a validation failure on a named field
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        AppError::Validation {
            message: message.into(),
            field: Some(field.to_string()),
        }
    }

    /// Get the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Validation { .. } => ErrorCode::ValidationError,
            AppError::Unauthorized { .. } => ErrorCode::Unauthorized,
            AppError::InvalidToken => ErrorCode::InvalidToken,
            AppError::ExpiredToken => ErrorCode::ExpiredToken,
            AppError::PaperNotFound { .. } => ErrorCode::PaperNotFound,
            AppError::InsufficientPapers { .. } => ErrorCode::InsufficientPapers,
            AppError::RateLimited { .. } => ErrorCode::RateLimited,
            AppError::Database(_) => ErrorCode::DatabaseError,
            AppError::DatabaseConnection { .. } => ErrorCode::ConnectionError,
            AppError::FeedUnavailable { .. } => ErrorCode::FeedUnavailable,
            AppError::FeedTimeout { .. } => ErrorCode::FeedTimeout,
            AppError::GenerationFailed { .. } => ErrorCode::GenerationFailed,
            AppError::GenerationTimeout { .. } => ErrorCode::GenerationTimeout,
            AppError::Internal { .. } => ErrorCode::InternalError,
            AppError::Configuration { .. } => ErrorCode::ConfigurationError,
            AppError::Serialization(_) => ErrorCode::SerializationError,
            AppError::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 400 Bad Request
            AppError::Validation { .. } => StatusCode::BAD_REQUEST,

            // 401 Unauthorized
            AppError::Unauthorized { .. } |
            AppError::InvalidToken |
            AppError::ExpiredToken => StatusCode::UNAUTHORIZED,

            // 404 Not Found
            AppError::PaperNotFound { .. } |
            AppError::InsufficientPapers { .. } => StatusCode::NOT_FOUND,

            // 429 Too Many Requests
            AppError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,

            // 500 Internal Server Error
            AppError::Database(_) |
            AppError::DatabaseConnection { .. } |
            AppError::Internal { .. } |
            AppError::Configuration { .. } |
            AppError::Serialization(_) |
            AppError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,

            // 502 Bad Gateway
            AppError::FeedUnavailable { .. } |
            AppError::GenerationFailed { .. } => StatusCode::BAD_GATEWAY,

            // 504 Gateway Timeout
            AppError::FeedTimeout { .. } |
            AppError::GenerationTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        }
    }

    /// Check if this error should be logged at error level
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }

    /// Check if this error is a client error
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }

    /// True for failures of the literature feed or the generative service
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            AppError::FeedUnavailable { .. }
                | AppError::FeedTimeout { .. }
                | AppError::GenerationFailed { .. }
                | AppError::GenerationTimeout { .. }
        )
    }

    /// Message safe to show to API clients.
    ///
    /// Client errors are correctable, so their detail is returned as-is.
    /// Everything else collapses to a retry-later message.
    pub fn public_message(&self) -> String {
        if self.is_client_error() {
            return self.to_string();
        }
        match self {
            AppError::FeedUnavailable { .. } | AppError::FeedTimeout { .. } => {
                "The paper search service is temporarily unavailable. Please try again later.".to_string()
            }
            AppError::GenerationFailed { .. } | AppError::GenerationTimeout { .. } => {
                "The AI assistant is temporarily unavailable. Please try again later.".to_string()
            }
            _ => "Something went wrong on our side. Please try again later.".to_string(),
        }
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
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();

        if self.is_server_error() {
            tracing::error!(
                error = %self,
                code = ?code,
                status = status.as_u16(),
                "Server error"
            );
        } else if self.is_client_error() {
            tracing::warn!(
                error = %self,
                code = ?code,
                status = status.as_u16(),
                "Client error"
            );
        }

        let field = match &self {
            AppError::Validation { field, .. } => field.clone(),
            _ => None,
        };

        let body = ErrorResponse {
            error: ErrorDetails {
                code,
                message: self.public_message(),
                field,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_mapping() {
        let err = AppError::PaperNotFound { id: "test".into() };
        assert_eq!(err.code(), ErrorCode::PaperNotFound);
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);

        let err = AppError::InsufficientPapers { found: 1, required: 2 };
        assert_eq!(err.code().as_code(), 4003);
        assert!(err.is_client_error());
    }

    #[test]
    fn test_validation_error() {
        let err = AppError::validation("topic", "topic is required");
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(!err.is_server_error());
        assert_eq!(err.public_message(), "Validation failed: topic is required");
    }

    #[test]
    fn test_upstream_errors_hide_detail() {
        let err = AppError::GenerationFailed {
            message: "API error 401: invalid api key sk-live-123".into(),
        };
        assert!(err.is_upstream());
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
        assert!(!err.public_message().contains("sk-live-123"));

        let err = AppError::FeedTimeout { timeout_ms: 15_000 };
        assert_eq!(err.status_code(), StatusCode::GATEWAY_TIMEOUT);
        assert!(err.public_message().contains("try again later"));
    }

    #[test]
    fn test_server_error() {
        let err = AppError::Internal {
            message: "connection pool poisoned".into(),
        };
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.is_server_error());
        assert!(!err.public_message().contains("poisoned"));
    }
}
