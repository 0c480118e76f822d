//! Error handling module for the Recipe Hub backend.
//!
//! Provides centralized error types with mapping to HTTP status codes and response envelopes.

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// Error codes as constants to avoid stringly-typed errors.
pub mod codes {
    pub const NO_TOKEN: &str = "NO_TOKEN";
    pub const INVALID_TOKEN: &str = "INVALID_TOKEN";
    pub const TOKEN_EXPIRED: &str = "TOKEN_EXPIRED";
    pub const INVALID_CREDENTIALS: &str = "INVALID_CREDENTIALS";
    pub const INCORRECT_PASSWORD: &str = "INCORRECT_PASSWORD";
    pub const UNAUTHORIZED: &str = "UNAUTHORIZED";

    pub const USER_NOT_FOUND: &str = "USER_NOT_FOUND";
    pub const RECIPE_NOT_FOUND: &str = "RECIPE_NOT_FOUND";
    pub const REVIEW_NOT_FOUND: &str = "REVIEW_NOT_FOUND";
    pub const NOTIFICATION_NOT_FOUND: &str = "NOTIFICATION_NOT_FOUND";

    pub const CANNOT_FOLLOW_SELF: &str = "CANNOT_FOLLOW_SELF";
    pub const ALREADY_FAVORITED: &str = "ALREADY_FAVORITED";
    pub const NOT_IN_FAVORITES: &str = "NOT_IN_FAVORITES";
    pub const ALREADY_SAVED: &str = "ALREADY_SAVED";
    pub const NOT_IN_SAVED: &str = "NOT_IN_SAVED";
    pub const DUPLICATE_REVIEW: &str = "DUPLICATE_REVIEW";
    pub const EMAIL_EXISTS: &str = "EMAIL_EXISTS";
    pub const USERNAME_EXISTS: &str = "USERNAME_EXISTS";
    pub const BADGE_EXISTS: &str = "BADGE_EXISTS";

    pub const VALIDATION_ERROR: &str = "VALIDATION_ERROR";
    pub const INVALID_RATING: &str = "INVALID_RATING";
    pub const MISSING_FIELDS: &str = "MISSING_FIELDS";
    pub const UNSUPPORTED_PLATFORM: &str = "UNSUPPORTED_PLATFORM";
    pub const INVALID_RESET_TOKEN: &str = "INVALID_RESET_TOKEN";
    pub const MISSING_REASON: &str = "MISSING_REASON";

    pub const DATABASE_ERROR: &str = "DATABASE_ERROR";
    pub const SEARCH_ERROR: &str = "SEARCH_ERROR";
    pub const STORAGE_ERROR: &str = "STORAGE_ERROR";
    pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";
}

/// Application error type.
///
/// The first five variants are expected outcomes a client can branch on; each
/// carries a stable code from [`codes`]. The rest are dependency failures.
#[derive(Debug)]
pub enum AppError {
    /// Missing, malformed or expired credentials
    Unauthenticated { code: &'static str, message: String },
    /// Actor does not own the resource
    Forbidden(String),
    /// Referenced entity does not exist
    NotFound { code: &'static str, message: String },
    /// Operation conflicts with the current relationship or record state
    InvalidState { code: &'static str, message: String },
    /// Malformed input
    Validation { code: &'static str, message: String },
    /// Database error
    Database(String),
    /// Search index error
    Search(String),
    /// Image storage error
    Storage(String),
    /// Internal server error
    Internal(String),
}

impl AppError {
    pub fn unauthenticated(code: &'static str, message: impl Into<String>) -> Self {
        AppError::Unauthenticated {
            code,
            message: message.into(),
        }
    }

    pub fn not_found(code: &'static str, message: impl Into<String>) -> Self {
        AppError::NotFound {
            code,
            message: message.into(),
        }
    }

    pub fn invalid_state(code: &'static str, message: impl Into<String>) -> Self {
        AppError::InvalidState {
            code,
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation {
            code: codes::VALIDATION_ERROR,
            message: message.into(),
        }
    }

    pub fn validation_code(code: &'static str, message: impl Into<String>) -> Self {
        AppError::Validation {
            code,
            message: message.into(),
        }
    }

    pub fn user_not_found(id: &str) -> Self {
        Self::not_found(codes::USER_NOT_FOUND, format!("User {} not found", id))
    }

    pub fn recipe_not_found(id: &str) -> Self {
        Self::not_found(codes::RECIPE_NOT_FOUND, format!("Recipe {} not found", id))
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthenticated { .. } => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::InvalidState { .. } => StatusCode::CONFLICT,
            AppError::Validation { .. } => StatusCode::BAD_REQUEST,
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Search(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Unauthenticated { code, .. } => *code,
            AppError::Forbidden(_) => codes::UNAUTHORIZED,
            AppError::NotFound { code, .. } => *code,
            AppError::InvalidState { code, .. } => *code,
            AppError::Validation { code, .. } => *code,
            AppError::Database(_) => codes::DATABASE_ERROR,
            AppError::Search(_) => codes::SEARCH_ERROR,
            AppError::Storage(_) => codes::STORAGE_ERROR,
            AppError::Internal(_) => codes::INTERNAL_ERROR,
        }
    }

    /// Get the error message.
    pub fn message(&self) -> String {
        match self {
            AppError::Unauthenticated { message, .. } => message.clone(),
            AppError::Forbidden(msg) => msg.clone(),
            AppError::NotFound { message, .. } => message.clone(),
            AppError::InvalidState { message, .. } => message.clone(),
            AppError::Validation { message, .. } => message.clone(),
            AppError::Database(msg) => msg.clone(),
            AppError::Search(msg) => msg.clone(),
            AppError::Storage(msg) => msg.clone(),
            AppError::Internal(msg) => msg.clone(),
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error_code(), self.message())
    }
}

impl std::error::Error for AppError {}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        tracing::error!("Database error: {:?}", err);
        AppError::Database(format!("Database error: {}", err))
    }
}

impl From<tantivy::TantivyError> for AppError {
    fn from(err: tantivy::TantivyError) -> Self {
        tracing::error!("Search error: {:?}", err);
        AppError::Search(format!("Search error: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        tracing::error!("JSON error: {:?}", err);
        AppError::validation(format!("JSON error: {}", err))
    }
}

impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                AppError::unauthenticated(codes::TOKEN_EXPIRED, "Token expired")
            }
            _ => AppError::unauthenticated(codes::INVALID_TOKEN, "Invalid token"),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::validation(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::validation(rejection.body_text())
    }
}

/// Error details in the response envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub code: String,
    pub message: String,
}

/// Error response envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: ErrorDetails,
}

impl ErrorResponse {
    pub fn new(error: &AppError) -> Self {
        Self {
            success: false,
            error: ErrorDetails {
                code: error.error_code().to_string(),
                message: error.message(),
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse::new(&self);
        (status, Json(body)).into_response()
    }
}
