//! Error types for ParkForge services
//!
//! Provides:
//! - Distinct error types for different failure modes
//! - HTTP status code mapping
//! - Structured error responses
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
    MissingField,
    InvalidFormat,
    NoVehicle,

    // Authentication errors (2xxx)
    Unauthorized,

    // Authorization errors (3xxx)
    Forbidden,

    // Resource errors (4xxx)
    NotFound,
    SlotNotFound,
    SessionNotFound,
    NoActiveSession,
    CodeNotFound,
    TariffNotConfigured,

    // Conflict errors (5xxx)
    Conflict,
    SlotUnavailable,
    SessionAlreadyActive,
    AlreadySettled,

    // Database errors (7xxx)
    DatabaseError,
    ConnectionError,
    TransactionError,

    // External service errors (8xxx)
    DependencyUnavailable,

    // Internal errors (9xxx)
    InternalError,
    ConfigurationError,
    SerializationError,
}

impl ErrorCode {
    /// Get the numeric code for this error
    pub fn as_code(&self) -> u16 {
        match self {
            // Validation (1xxx)
            ErrorCode::ValidationError => 1001,
            ErrorCode::MissingField => 1002,
            ErrorCode::InvalidFormat => 1003,
            ErrorCode::NoVehicle => 1004,

            // Auth (2xxx)
            ErrorCode::Unauthorized => 2001,

            // Authz (3xxx)
            ErrorCode::Forbidden => 3001,

            // Resources (4xxx)
            ErrorCode::NotFound => 4001,
            ErrorCode::SlotNotFound => 4002,
            ErrorCode::SessionNotFound => 4003,
            ErrorCode::NoActiveSession => 4004,
            ErrorCode::CodeNotFound => 4005,
            ErrorCode::TariffNotConfigured => 4006,

            // Conflicts (5xxx)
            ErrorCode::Conflict => 5001,
            ErrorCode::SlotUnavailable => 5002,
            ErrorCode::SessionAlreadyActive => 5003,
            ErrorCode::AlreadySettled => 5004,

            // Database (7xxx)
            ErrorCode::DatabaseError => 7001,
            ErrorCode::ConnectionError => 7002,
            ErrorCode::TransactionError => 7003,

            // External (8xxx)
            ErrorCode::DependencyUnavailable => 8001,

            // Internal (9xxx)
            ErrorCode::InternalError => 9001,
            ErrorCode::ConfigurationError => 9002,
            ErrorCode::SerializationError => 9003,
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

    #[error("Required field missing: {field}")]
    MissingField { field: String },

    #[error("Invalid format: {message}")]
    InvalidFormat { message: String },

    #[error("No registered vehicle for this user")]
    NoVehicle,

    // Authentication errors (includes ownership mismatch on settlement)
    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    // Authorization errors
    #[error("Forbidden: {message}")]
    Forbidden { message: String },

    // Resource errors
    #[error("Resource not found: {resource_type} with id {id}")]
    NotFound { resource_type: String, id: String },

    #[error("Slot not found: {id}")]
    SlotNotFound { id: i32 },

    #[error("Session not found: {id}")]
    SessionNotFound { id: String },

    #[error("No active parking session")]
    NoActiveSession,

    #[error("Redemption code not found")]
    CodeNotFound,

    #[error("No tariff configured")]
    TariffNotConfigured,

    // Conflict errors
    #[error("Slot {id} is not available")]
    SlotUnavailable { id: i32 },

    #[error("User already has an active parking session")]
    SessionAlreadyActive,

    #[error("Session {session_id} is already settled")]
    AlreadySettled { session_id: String },

    // Database errors
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Database connection error: {message}")]
    DatabaseConnection { message: String },

    #[error("Transaction error: {message}")]
    Transaction { message: String },

    // External service errors
    #[error("Dependency unavailable: {service}")]
    DependencyUnavailable { service: String },

    // Internal errors
    #[error("Internal server error: {message}")]
    Internal { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Generic
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Get the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Validation { .. } => ErrorCode::ValidationError,
            AppError::MissingField { .. } => ErrorCode::MissingField,
            AppError::InvalidFormat { .. } => ErrorCode::InvalidFormat,
            AppError::NoVehicle => ErrorCode::NoVehicle,
            AppError::Unauthorized { .. } => ErrorCode::Unauthorized,
            AppError::Forbidden { .. } => ErrorCode::Forbidden,
            AppError::NotFound { .. } => ErrorCode::NotFound,
            AppError::SlotNotFound { .. } => ErrorCode::SlotNotFound,
            AppError::SessionNotFound { .. } => ErrorCode::SessionNotFound,
            AppError::NoActiveSession => ErrorCode::NoActiveSession,
            AppError::CodeNotFound => ErrorCode::CodeNotFound,
            AppError::TariffNotConfigured => ErrorCode::TariffNotConfigured,
            AppError::SlotUnavailable { .. } => ErrorCode::SlotUnavailable,
            AppError::SessionAlreadyActive => ErrorCode::SessionAlreadyActive,
            AppError::AlreadySettled { .. } => ErrorCode::AlreadySettled,
            AppError::Database(_) => ErrorCode::DatabaseError,
            AppError::DatabaseConnection { .. } => ErrorCode::ConnectionError,
            AppError::Transaction { .. } => ErrorCode::TransactionError,
            AppError::DependencyUnavailable { .. } => ErrorCode::DependencyUnavailable,
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
            AppError::Validation { .. }
            | AppError::MissingField { .. }
            | AppError::InvalidFormat { .. }
            | AppError::NoVehicle => StatusCode::BAD_REQUEST,

            // 401 Unauthorized
            AppError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,

            // 403 Forbidden
            AppError::Forbidden { .. } => StatusCode::FORBIDDEN,

            // 404 Not Found
            AppError::NotFound { .. }
            | AppError::SlotNotFound { .. }
            | AppError::SessionNotFound { .. }
            | AppError::NoActiveSession
            | AppError::CodeNotFound
            | AppError::TariffNotConfigured => StatusCode::NOT_FOUND,

            // 409 Conflict
            AppError::SlotUnavailable { .. }
            | AppError::SessionAlreadyActive
            | AppError::AlreadySettled { .. } => StatusCode::CONFLICT,

            // 500 Internal Server Error
            AppError::Database(_)
            | AppError::DatabaseConnection { .. }
            | AppError::Transaction { .. }
            | AppError::Internal { .. }
            | AppError::Configuration { .. }
            | AppError::Serialization(_)
            | AppError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,

            // 503 Service Unavailable
            AppError::DependencyUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
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

    /// Message safe to return to the client.
    ///
    /// Storage and internal failures carry connection strings and driver
    /// detail in their Display impls; those stay in the log.
    pub fn public_message(&self) -> String {
        match self {
            AppError::Database(_)
            | AppError::DatabaseConnection { .. }
            | AppError::Transaction { .. }
            | AppError::Internal { .. }
            | AppError::Configuration { .. }
            | AppError::Serialization(_)
            | AppError::Other(_) => "Internal server error".to_string(),
            _ => self.to_string(),
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
    pub details: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();

        // Log based on severity; the full message never reaches the client
        // for server-side failures.
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

        let body = ErrorResponse {
            error: ErrorDetails {
                code,
                message: self.public_message(),
                details: None,
                request_id: None, // filled by middleware when present
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
        let err = AppError::SessionNotFound { id: "test".into() };
        assert_eq!(err.code(), ErrorCode::SessionNotFound);
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_conflict_errors() {
        let err = AppError::SlotUnavailable { id: 5 };
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert!(err.is_client_error());

        let err = AppError::SessionAlreadyActive;
        assert_eq!(err.status_code(), StatusCode::CONFLICT);

        let err = AppError::AlreadySettled {
            session_id: "abc".into(),
        };
        assert_eq!(err.code(), ErrorCode::AlreadySettled);
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_dependency_unavailable_is_retryable_5xx() {
        let err = AppError::DependencyUnavailable {
            service: "tariff".into(),
        };
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(err.is_server_error());
    }

    #[test]
    fn test_server_errors_hide_detail() {
        let err = AppError::DatabaseConnection {
            message: "postgres://sa:SaPass123@db:5432 refused".into(),
        };
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.public_message(), "Internal server error");

        // Client errors keep their message
        let err = AppError::SlotUnavailable { id: 3 };
        assert!(err.public_message().contains('3'));
    }

    #[test]
    fn test_validation_error() {
        let err = AppError::Validation {
            message: "minutes must be non-negative".into(),
            field: Some("minutes".into()),
        };
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(!err.is_server_error());
        assert!(err.is_client_error());
    }
}
