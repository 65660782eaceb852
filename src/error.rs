//! Gateway error types with HTTP status code mapping.
//!
//! [`GatewayError`] is the central error type for the gateway. Each variant
//! maps to a specific HTTP status code and structured JSON error response.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::PriceError;

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "success": false,
///   "message": "pricing data has not been synced yet",
///   "code": 2001
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Always `false`.
    pub success: bool,
    /// Human-readable error message.
    pub message: String,
    /// Numeric error code (see code ranges on [`GatewayError`]).
    pub code: u32,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Server-side error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category              | HTTP Status                      |
/// |-----------|-----------------------|----------------------------------|
/// | 1000–1999 | Validation / pricing  | 400 Bad Request / 422            |
/// | 2000–2999 | State / access        | 401 / 404 Not Found / 409        |
/// | 3000–3999 | Server / upstream     | 500 / 502 Bad Gateway            |
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Request validation failed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The configuration cannot be priced.
    #[error("cannot price configuration: {0}")]
    Pricing(#[from] PriceError),

    /// No pricing snapshot has ever been written.
    #[error("pricing data has not been synced yet")]
    PricingNotAvailable,

    /// Session with the given ID was not found.
    #[error("session not found: {0}")]
    SessionNotFound(String),

    /// Inquiry with the given ID was not found.
    #[error("inquiry not found: {0}")]
    InquiryNotFound(uuid::Uuid),

    /// Requested session status change is not part of the lifecycle.
    #[error("invalid session transition from {from} to {to}")]
    InvalidTransition {
        /// Current status.
        from: String,
        /// Requested status.
        to: String,
    },

    /// Missing or wrong credentials.
    #[error("unauthorized")]
    Unauthorized,

    /// Another pricing sync is running in this process.
    #[error("a pricing sync is already in progress")]
    SyncInProgress,

    /// Another analytics flush is running in this process.
    #[error("an analytics flush is already in progress")]
    FlushInProgress,

    /// A category every snapshot needs could not be produced.
    #[error("required pricing categories missing: {0}")]
    MissingCategories(String),

    /// The spreadsheet source could not be reached or refused access.
    #[error("pricing source unavailable: {0}")]
    SourceUnavailable(String),

    /// Persistence layer failure.
    #[error("persistence error: {0}")]
    PersistenceError(String),

    /// Event buffer failure.
    #[error("event buffer error: {0}")]
    BufferError(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidRequest(_) => 1001,
            Self::Pricing(_) => 1002,
            Self::InvalidTransition { .. } => 1003,
            Self::PricingNotAvailable => 2001,
            Self::SessionNotFound(_) => 2002,
            Self::InquiryNotFound(_) => 2003,
            Self::Unauthorized => 2010,
            Self::SyncInProgress => 2020,
            Self::FlushInProgress => 2021,
            Self::Internal(_) => 3000,
            Self::PersistenceError(_) => 3001,
            Self::BufferError(_) => 3002,
            Self::SourceUnavailable(_) => 3003,
            Self::MissingCategories(_) => 3004,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::Pricing(_) | Self::InvalidTransition { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::PricingNotAvailable | Self::SessionNotFound(_) | Self::InquiryNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::SyncInProgress | Self::FlushInProgress => StatusCode::CONFLICT,
            Self::SourceUnavailable(_) => StatusCode::BAD_GATEWAY,
            Self::MissingCategories(_)
            | Self::PersistenceError(_)
            | Self::BufferError(_)
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<sqlx::Error> for GatewayError {
    fn from(err: sqlx::Error) -> Self {
        Self::PersistenceError(err.to_string())
    }
}

impl From<redis::RedisError> for GatewayError {
    fn from(err: redis::RedisError) -> Self {
        Self::BufferError(err.to_string())
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(code = self.error_code(), error = %self, "request failed");
        }
        let body = ErrorResponse {
            success: false,
            message: self.to_string(),
            code: self.error_code(),
            details: None,
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}
