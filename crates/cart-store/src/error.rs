use common::CartId;
use thiserror::Error;

/// Errors raised by cart store operations.
#[derive(Debug, Error)]
pub enum CartStoreError {
    /// The cart does not exist or has expired.
    #[error("Cart {0} not found")]
    NotFound(CartId),

    /// No live cart belongs to this user.
    #[error("No cart found for user {0}")]
    UserCartNotFound(common::UserId),

    /// A domain rule was violated while mutating the cart.
    #[error(transparent)]
    Domain(#[from] domain::DomainError),

    /// The persisted cart payload is corrupt.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The backing store failed outside of a database call.
    #[error("Store error: {0}")]
    Store(String),
}

/// Result type for cart store operations.
pub type Result<T> = std::result::Result<T, CartStoreError>;
