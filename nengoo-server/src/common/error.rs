//! Unified Error Handling
//!
//! Provides application-wide error types and response structures.
//! Every error carries a stable `E####` code so clients can branch on
//! it without parsing messages.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::error;

/// Unified API response structure
#[derive(Debug, Serialize)]
pub struct AppResponse<T> {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

/// Application-level error type
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // ========== Authentication Errors ==========
    #[error("Authentication required")]
    Unauthorized,

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    // ========== Checkout Faults ==========
    #[error("Cart is empty")]
    EmptyCart,

    #[error("Invalid quantity: {0}")]
    InvalidQuantity(String),

    // ========== Order State Faults ==========
    #[error("Illegal transition: {0}")]
    IllegalTransition(String),

    // ========== Generic Business Errors ==========
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    // ========== System Errors ==========
    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn permission_denied(msg: impl Into<String>) -> Self {
        AppError::PermissionDenied(msg.into())
    }

    pub fn invalid_quantity(msg: impl Into<String>) -> Self {
        AppError::InvalidQuantity(msg.into())
    }

    pub fn illegal_transition(msg: impl Into<String>) -> Self {
        AppError::IllegalTransition(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        AppError::NotFound(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    pub fn database(msg: impl Into<String>) -> Self {
        AppError::Database(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        AppError::Internal(msg.into())
    }

    /// Stable machine-readable code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Unauthorized => "E3001",
            AppError::PermissionDenied(_) => "E2001",
            AppError::EmptyCart => "E1001",
            AppError::InvalidQuantity(_) => "E1002",
            AppError::IllegalTransition(_) => "E1003",
            AppError::NotFound(_) => "E0003",
            AppError::Validation(_) => "E0002",
            AppError::Database(_) => "E9002",
            AppError::Internal(_) => "E9001",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let code = self.code();
        let (status, message) = match &self {
            // Authentication errors (401)
            AppError::Unauthorized => {
                (StatusCode::UNAUTHORIZED, "Please login first".to_string())
            }

            // Authorization errors (403)
            AppError::PermissionDenied(msg) => (StatusCode::FORBIDDEN, msg.clone()),

            // Checkout faults (400) - surfaced verbatim so the UI can
            // show them inline at the point of submission
            AppError::EmptyCart => (StatusCode::BAD_REQUEST, self.to_string()),
            AppError::InvalidQuantity(msg) => (StatusCode::BAD_REQUEST, msg.clone()),

            // State faults (422) - never downgraded to a silent no-op
            AppError::IllegalTransition(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg.clone()),

            // Not found (404) - also covers records that exist but
            // belong to another caller, so existence is never leaked
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),

            // Validation (400)
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),

            // Database errors (500)
            AppError::Database(msg) => {
                error!(target: "database", error = %msg, "Database error occurred");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database error".to_string(),
                )
            }

            // Internal errors (500)
            AppError::Internal(msg) => {
                error!(target: "internal", error = %msg, "Internal error occurred");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(AppResponse::<()> {
            code: code.to_string(),
            message,
            data: None,
        });

        (status, body).into_response()
    }
}

impl From<crate::storage::StorageError> for AppError {
    fn from(e: crate::storage::StorageError) -> Self {
        AppError::Database(e.to_string())
    }
}

/// Application result alias used by handlers and services
pub type AppResult<T> = Result<T, AppError>;
