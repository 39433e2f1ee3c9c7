//! Products as seen by the inventory ledger.

use chrono::{DateTime, Utc};
use common::ProductId;
use serde::{Deserialize, Serialize};

use crate::{DomainError, Money};

/// A product row from the inventory ledger.
///
/// This is the authoritative view of price, stock, and availability. The
/// fulfillment engine reads it inside its own transaction; cart-cached
/// snapshots never override it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: Option<String>,
    pub price: Money,
    pub stock: i32,
    pub is_available: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns true when the product can satisfy a request for `quantity` units.
    pub fn can_satisfy(&self, quantity: u32) -> bool {
        self.is_available && i64::from(self.stock) >= i64::from(quantity)
    }
}

/// Payload for provisioning a product into the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub description: Option<String>,
    pub price: Money,
    pub stock: i32,
}

impl NewProduct {
    /// Validates a new product, rejecting a negative price or stock level.
    pub fn new(
        name: impl Into<String>,
        description: Option<String>,
        price: Money,
        stock: i32,
    ) -> Result<Self, DomainError> {
        if price.is_negative() {
            return Err(DomainError::NegativePrice(price));
        }
        if stock < 0 {
            return Err(DomainError::NegativeStock(stock));
        }
        Ok(Self {
            name: name.into(),
            description,
            price,
            stock,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(stock: i32, is_available: bool) -> Product {
        let now = Utc::now();
        Product {
            id: ProductId::new(1),
            name: "Widget".to_string(),
            description: None,
            price: Money::from_cents(1000),
            stock,
            is_available,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_can_satisfy_checks_stock_and_availability() {
        assert!(product(5, true).can_satisfy(5));
        assert!(!product(5, true).can_satisfy(6));
        assert!(!product(5, true).can_satisfy(3_000_000_000));
        assert!(!product(5, false).can_satisfy(1));
        assert!(!product(0, true).can_satisfy(1));
    }

    #[test]
    fn test_new_product_validation() {
        assert!(NewProduct::new("Widget", None, Money::from_cents(100), 10).is_ok());
        assert_eq!(
            NewProduct::new("Widget", None, Money::from_cents(-1), 10),
            Err(DomainError::NegativePrice(Money::from_cents(-1)))
        );
        assert_eq!(
            NewProduct::new("Widget", None, Money::from_cents(100), -3),
            Err(DomainError::NegativeStock(-3))
        );
    }
}
