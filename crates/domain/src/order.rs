//! Orders, order lines, and fulfillment requests.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use common::{OrderId, ProductId, UserId};
use serde::{Deserialize, Serialize};

use crate::{DomainError, MAX_LINE_QUANTITY, Money};

/// One product-and-quantity entry within a committed order.
///
/// `unit_price` is the price observed by the fulfillment engine inside its
/// own transaction, never a cart-supplied snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub id: i64,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub quantity: u32,
    pub unit_price: Money,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrderLine {
    /// Returns quantity × unit price for this line.
    pub fn line_total(&self) -> Money {
        self.unit_price.multiply(self.quantity)
    }
}

/// A durable, immutable-once-created purchase record.
///
/// Orders support creation, lookup, and cascading deletion only. A `None`
/// user id marks a guest order; guest orders are first-class everywhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: Option<UserId>,
    pub total_price: Money,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub lines: Vec<OrderLine>,
}

impl Order {
    /// Returns true when `total_price` equals the sum of its line totals.
    ///
    /// Holds for every order the fulfillment engine commits; exposed so
    /// tests and audits can verify it.
    pub fn total_is_consistent(&self) -> bool {
        let sum = self
            .lines
            .iter()
            .fold(Money::zero(), |acc, line| acc + line.line_total());
        sum == self.total_price
    }
}

/// One requested line in a [`CreateOrderRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRequest {
    pub product_id: ProductId,
    pub quantity: u32,
}

impl LineRequest {
    pub fn new(product_id: ProductId, quantity: u32) -> Self {
        Self {
            product_id,
            quantity,
        }
    }
}

/// A validated request for the fulfillment engine.
///
/// Construction merges duplicate product ids by summing their quantities,
/// so validation and the stock decrement always see one line per product.
/// Carries no prices: the engine prices every line from the ledger inside
/// its own transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateOrderRequest {
    user_id: Option<UserId>,
    lines: Vec<LineRequest>,
}

impl CreateOrderRequest {
    /// Builds a request, rejecting an empty line set and any zero or
    /// out-of-range quantity, before or after the merge.
    pub fn new(
        user_id: Option<UserId>,
        lines: impl IntoIterator<Item = LineRequest>,
    ) -> Result<Self, DomainError> {
        let mut merged: BTreeMap<ProductId, u32> = BTreeMap::new();
        for line in lines {
            if line.quantity == 0 {
                return Err(DomainError::InvalidQuantity(line.quantity));
            }
            if line.quantity > MAX_LINE_QUANTITY {
                return Err(DomainError::ExcessiveQuantity(line.quantity));
            }
            let quantity = merged.entry(line.product_id).or_insert(0);
            *quantity = quantity.saturating_add(line.quantity);
            if *quantity > MAX_LINE_QUANTITY {
                return Err(DomainError::ExcessiveQuantity(*quantity));
            }
        }
        if merged.is_empty() {
            return Err(DomainError::EmptyOrder);
        }
        Ok(Self {
            user_id,
            lines: merged
                .into_iter()
                .map(|(product_id, quantity)| LineRequest {
                    product_id,
                    quantity,
                })
                .collect(),
        })
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.user_id
    }

    /// Returns the merged lines in product-id order.
    pub fn lines(&self) -> &[LineRequest] {
        &self.lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_merges_duplicate_products() {
        let request = CreateOrderRequest::new(
            Some(UserId::new(1)),
            [
                LineRequest::new(ProductId::new(7), 2),
                LineRequest::new(ProductId::new(9), 1),
                LineRequest::new(ProductId::new(7), 3),
            ],
        )
        .unwrap();

        assert_eq!(
            request.lines(),
            &[
                LineRequest::new(ProductId::new(7), 5),
                LineRequest::new(ProductId::new(9), 1),
            ]
        );
    }

    #[test]
    fn test_request_rejects_empty_line_set() {
        let result = CreateOrderRequest::new(None, []);
        assert_eq!(result, Err(DomainError::EmptyOrder));
    }

    #[test]
    fn test_request_rejects_zero_quantity() {
        let result = CreateOrderRequest::new(None, [LineRequest::new(ProductId::new(1), 0)]);
        assert_eq!(result, Err(DomainError::InvalidQuantity(0)));
    }

    #[test]
    fn test_request_rejects_quantity_above_stock_range() {
        let result =
            CreateOrderRequest::new(None, [LineRequest::new(ProductId::new(1), 3_000_000_000)]);
        assert_eq!(result, Err(DomainError::ExcessiveQuantity(3_000_000_000)));

        // The cap itself is fine.
        let request =
            CreateOrderRequest::new(None, [LineRequest::new(ProductId::new(1), MAX_LINE_QUANTITY)])
                .unwrap();
        assert_eq!(request.lines()[0].quantity, MAX_LINE_QUANTITY);
    }

    #[test]
    fn test_request_rejects_merged_quantity_above_stock_range() {
        let result = CreateOrderRequest::new(
            None,
            [
                LineRequest::new(ProductId::new(1), 2_000_000_000),
                LineRequest::new(ProductId::new(1), 2_000_000_000),
            ],
        );
        assert_eq!(result, Err(DomainError::ExcessiveQuantity(4_000_000_000)));
    }

    #[test]
    fn test_guest_request_has_no_user() {
        let request =
            CreateOrderRequest::new(None, [LineRequest::new(ProductId::new(1), 1)]).unwrap();
        assert_eq!(request.user_id(), None);
    }

    #[test]
    fn test_total_is_consistent() {
        let now = Utc::now();
        let line = |id: i64, quantity: u32, cents: i64| OrderLine {
            id,
            order_id: OrderId::new(1),
            product_id: ProductId::new(id),
            quantity,
            unit_price: Money::from_cents(cents),
            created_at: now,
            updated_at: now,
        };

        let mut order = Order {
            id: OrderId::new(1),
            user_id: Some(UserId::new(1)),
            total_price: Money::from_cents(3500),
            created_at: now,
            updated_at: now,
            lines: vec![line(1, 2, 1000), line(2, 1, 1500)],
        };
        assert!(order.total_is_consistent());

        order.total_price = Money::from_cents(3400);
        assert!(!order.total_is_consistent());
    }
}
