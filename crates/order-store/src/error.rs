use common::{OrderId, ProductId};
use thiserror::Error;

/// Errors raised by the order store and inventory ledger.
#[derive(Debug, Error)]
pub enum OrderStoreError {
    /// The order does not exist.
    #[error("Order {0} not found")]
    OrderNotFound(OrderId),

    /// The product does not exist in the ledger.
    #[error("Product {0} not found")]
    ProductNotFound(ProductId),

    /// The request named unavailable or insufficient-stock products.
    /// Permanent given the currently committed state; not retryable.
    #[error("Order request has unavailable or insufficient-stock items \
             (unavailable: {unavailable:?}, insufficient stock: {insufficient_stock:?})")]
    Validation {
        unavailable: Vec<ProductId>,
        insufficient_stock: Vec<ProductId>,
    },

    /// The serializable transaction kept aborting on conflict. Transient:
    /// the caller may retry the whole request.
    #[error("Transaction aborted by conflict after {attempts} attempts")]
    TransactionConflict { attempts: u32 },

    /// A domain rule was violated while building the request.
    #[error(transparent)]
    Domain(#[from] domain::DomainError),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The backing store failed outside of a database call.
    #[error("Store error: {0}")]
    Store(String),
}

/// Result type for order store operations.
pub type Result<T> = std::result::Result<T, OrderStoreError>;
