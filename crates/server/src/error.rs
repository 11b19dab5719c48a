//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures system errors to Sentry
//! before responding to the client. All route handlers should return
//! `Result<T, AppError>`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::cart::CartError;
use crate::services::checkout::CheckoutError;
use crate::services::orders::OrderStatusError;

/// Application-level error type for the service.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Cart operation failed.
    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    /// Checkout failed.
    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    /// Order status transition failed.
    #[error("Order status error: {0}")]
    Status(#[from] OrderStatusError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Request lacks a valid identity.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// JSON error body returned to clients.
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl AppError {
    /// Whether this is a system failure rather than a request-level one.
    fn is_system(&self) -> bool {
        match self {
            Self::Database(_) | Self::Internal(_) => true,
            Self::Cart(CartError::Repository(_))
            | Self::Checkout(CheckoutError::Repository(_))
            | Self::Status(OrderStatusError::Repository(_)) => true,
            _ => false,
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Cart(err) => match err {
                CartError::LineNotFound(_) => StatusCode::NOT_FOUND,
                CartError::InvalidQuantity(_) => StatusCode::BAD_REQUEST,
                CartError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Checkout(err) => match err {
                CheckoutError::InvalidAddress(_)
                | CheckoutError::EmptyOrder
                | CheckoutError::InvalidQuantity(_) => StatusCode::BAD_REQUEST,
                CheckoutError::ProductNotFound(_) => StatusCode::NOT_FOUND,
                CheckoutError::InsufficientStock(_) => StatusCode::CONFLICT,
                CheckoutError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Status(err) => match err {
                OrderStatusError::OrderNotFound(_) => StatusCode::NOT_FOUND,
                OrderStatusError::InvalidTransition { .. } => StatusCode::CONFLICT,
                OrderStatusError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture system errors to Sentry; request-level failures are the
        // caller's problem, not ours.
        if self.is_system() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let status = self.status_code();

        // Don't expose internal error details to clients
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;
