use cart_store::CartStoreError;
use common::{CartId, ProductId};
use order_store::OrderStoreError;
use thiserror::Error;

/// Errors raised by the cart service and the checkout coordinator.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// The cart does not exist or has expired.
    #[error("Cart not found")]
    CartNotFound(CartId),

    /// Checkout of an empty cart is a business-rule violation.
    #[error("Cart is empty")]
    EmptyCart,

    /// The product is absent from the ledger or flagged unavailable.
    #[error("Product {0} is not available")]
    ProductUnavailable(ProductId),

    /// Advisory stock check failed at cart-edit time.
    #[error("Insufficient stock for product {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: ProductId,
        requested: u32,
        available: i32,
    },

    /// A domain rule was violated.
    #[error(transparent)]
    Domain(#[from] domain::DomainError),

    /// The cart store failed.
    #[error(transparent)]
    Cart(#[from] CartStoreError),

    /// The order store or inventory ledger failed.
    #[error(transparent)]
    Order(#[from] OrderStoreError),
}

impl CheckoutError {
    /// Maps a cart store lookup failure, folding `NotFound` into
    /// [`CheckoutError::CartNotFound`].
    pub fn from_cart_lookup(cart_id: CartId, error: CartStoreError) -> Self {
        match error {
            CartStoreError::NotFound(_) => CheckoutError::CartNotFound(cart_id),
            other => CheckoutError::Cart(other),
        }
    }
}

/// Result type for checkout operations.
pub type Result<T> = std::result::Result<T, CheckoutError>;
