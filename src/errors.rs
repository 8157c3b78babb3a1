use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::entities::order::ShipmentStatus;

/// Error structure returned to HTTP callers.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// HTTP status category (e.g., "Not Found", "Bad Request")
    pub error: String,
    /// Human-readable error description
    pub message: String,
    /// ISO 8601 timestamp when the error occurred
    pub timestamp: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sea_orm::error::DbErr),

    #[error("Cart is empty for user {0}")]
    CartEmpty(String),

    #[error("Address not found: {0}")]
    AddressNotFound(String),

    #[error("Cart total is zero; cannot place order")]
    ZeroTotal,

    #[error("Payment initiation failed: {0}")]
    PaymentInitiationFailure(String),

    #[error("Insufficient stock: {0}")]
    InsufficientStock(String),

    #[error("Order not found: {0}")]
    OrderNotFound(String),

    #[error("Invalid status: {0}")]
    InvalidStatus(String),

    #[error("Cannot move status backwards from {from} to {to}")]
    BackwardTransition {
        from: ShipmentStatus,
        to: ShipmentStatus,
    },

    #[error("Must progress step-by-step from {from}; next allowed: {next}")]
    SkippedStep {
        from: ShipmentStatus,
        next: ShipmentStatus,
    },

    #[error("Order {0} is already marked as PAID")]
    AlreadyPaid(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("External service error: {0}")]
    ExternalServiceError(String),

    #[error("Event error: {0}")]
    EventError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(err.to_string())
    }
}

impl ServiceError {
    /// Returns the HTTP status code for this error.
    /// This is the single source of truth for error-to-status mapping.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::DatabaseError(_) | Self::EventError(_) | Self::InternalError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::AddressNotFound(_) | Self::OrderNotFound(_) | Self::NotFound(_) => {
                StatusCode::NOT_FOUND
            }
            Self::CartEmpty(_)
            | Self::ZeroTotal
            | Self::InvalidStatus(_)
            | Self::BackwardTransition { .. }
            | Self::SkippedStep { .. }
            | Self::ValidationError(_) => StatusCode::BAD_REQUEST,
            Self::PaymentInitiationFailure(_) => StatusCode::PAYMENT_REQUIRED,
            Self::InsufficientStock(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::AlreadyPaid(_) | Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::ExternalServiceError(_) => StatusCode::BAD_GATEWAY,
        }
    }

    /// Returns the error message suitable for HTTP responses.
    /// Internal errors return generic messages to avoid leaking implementation details.
    pub fn response_message(&self) -> String {
        match self {
            Self::DatabaseError(_) => "Database error".to_string(),
            Self::EventError(_) | Self::InternalError(_) => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let err = ErrorResponse {
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            message: self.response_message(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        (status, Json(err)).into_response()
    }
}
