//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use cart_store::CartStoreError;
use checkout::CheckoutError;
use domain::DomainError;
use order_store::OrderStoreError;

/// API-level error type that maps to HTTP responses.
///
/// Client-facing outcomes: not found → 404, malformed request → 400,
/// business-rule violation → 422. A transient transaction conflict maps to
/// 503 so clients know to retry; store and serialization failures map
/// to 500.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Malformed request from the client.
    BadRequest(String),
    /// Business-rule violation.
    Validation(String),
    /// Transient conflict; the request may be retried.
    Conflict(String),
    /// Internal server error.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Validation(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            ApiError::Conflict(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::LineNotFound(_) => ApiError::NotFound(err.to_string()),
            _ => ApiError::Validation(err.to_string()),
        }
    }
}

impl From<CartStoreError> for ApiError {
    fn from(err: CartStoreError) -> Self {
        match err {
            CartStoreError::NotFound(_) | CartStoreError::UserCartNotFound(_) => {
                ApiError::NotFound(err.to_string())
            }
            CartStoreError::Domain(domain_err) => domain_err.into(),
            CartStoreError::Serialization(_)
            | CartStoreError::Database(_)
            | CartStoreError::Store(_) => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<OrderStoreError> for ApiError {
    fn from(err: OrderStoreError) -> Self {
        match err {
            OrderStoreError::OrderNotFound(_) | OrderStoreError::ProductNotFound(_) => {
                ApiError::NotFound(err.to_string())
            }
            OrderStoreError::Validation { .. } => ApiError::Validation(err.to_string()),
            OrderStoreError::TransactionConflict { .. } => ApiError::Conflict(err.to_string()),
            OrderStoreError::Domain(domain_err) => domain_err.into(),
            OrderStoreError::Database(_) | OrderStoreError::Store(_) => {
                ApiError::Internal(err.to_string())
            }
        }
    }
}

impl From<CheckoutError> for ApiError {
    fn from(err: CheckoutError) -> Self {
        match err {
            CheckoutError::CartNotFound(_) => ApiError::NotFound(err.to_string()),
            CheckoutError::EmptyCart
            | CheckoutError::ProductUnavailable(_)
            | CheckoutError::InsufficientStock { .. } => ApiError::Validation(err.to_string()),
            CheckoutError::Domain(domain_err) => domain_err.into(),
            CheckoutError::Cart(cart_err) => cart_err.into(),
            CheckoutError::Order(order_err) => order_err.into(),
        }
    }
}
