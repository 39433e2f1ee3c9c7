//! Domain validation errors.

use common::ProductId;
use thiserror::Error;

use crate::Money;

/// Errors raised by domain-level validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// Quantities are positive integers.
    #[error("Quantity must be at least 1, got {0}")]
    InvalidQuantity(u32),

    /// Quantities stay within stock range.
    #[error("Quantity must not exceed {max}, got {0}", max = crate::MAX_LINE_QUANTITY)]
    ExcessiveQuantity(u32),

    /// Prices are never negative.
    #[error("Price must not be negative, got {0}")]
    NegativePrice(Money),

    /// Stock levels are never negative.
    #[error("Stock must not be negative, got {0}")]
    NegativeStock(i32),

    /// A fulfillment request needs at least one line.
    #[error("Order request has no lines")]
    EmptyOrder,

    /// The cart holds no line for this product.
    #[error("Product {0} is not in the cart")]
    LineNotFound(ProductId),
}
