//! Shopping cart entity and line items.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use common::{CartId, ProductId, UserId};
use serde::{Deserialize, Serialize};

use crate::{DomainError, MAX_LINE_QUANTITY, Money};

/// A single product line held in a cart.
///
/// `unit_price` and `name` are snapshots taken from the inventory ledger
/// when the line is added. They may go stale; the fulfillment engine never
/// trusts them at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: ProductId,
    pub quantity: u32,
    pub unit_price: Money,
    pub name: String,
}

impl CartLine {
    /// Creates a cart line, rejecting a zero or out-of-range quantity and a
    /// negative price.
    pub fn new(
        product_id: ProductId,
        quantity: u32,
        unit_price: Money,
        name: impl Into<String>,
    ) -> Result<Self, DomainError> {
        if quantity == 0 {
            return Err(DomainError::InvalidQuantity(quantity));
        }
        if quantity > MAX_LINE_QUANTITY {
            return Err(DomainError::ExcessiveQuantity(quantity));
        }
        if unit_price.is_negative() {
            return Err(DomainError::NegativePrice(unit_price));
        }
        Ok(Self {
            product_id,
            quantity,
            unit_price,
            name: name.into(),
        })
    }

    /// Returns quantity × unit price for this line.
    pub fn line_total(&self) -> Money {
        self.unit_price.multiply(self.quantity)
    }
}

/// A customer's shopping cart.
///
/// Lines are keyed by product id, so a product appears at most once; adding
/// it again merges quantities. Every mutation refreshes `updated_at` and
/// re-arms the sliding expiration window from the mutation instant.
///
/// The serialized form carries the line map as an ordered list of
/// `(product_id, line)` pairs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    id: CartId,
    user_id: UserId,
    #[serde(with = "items_as_pairs")]
    items: BTreeMap<ProductId, CartLine>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl Cart {
    /// Creates a fresh, empty cart with a full expiration window.
    pub fn new(user_id: UserId, now: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            id: CartId::new(),
            user_id,
            items: BTreeMap::new(),
            created_at: now,
            updated_at: now,
            expires_at: now + ttl,
        }
    }

    pub fn id(&self) -> CartId {
        self.id
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Returns the lines in product-id order.
    pub fn lines(&self) -> impl Iterator<Item = &CartLine> {
        self.items.values()
    }

    /// Returns the line for a product, if present.
    pub fn line(&self, product_id: ProductId) -> Option<&CartLine> {
        self.items.get(&product_id)
    }

    pub fn line_count(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Returns true once the expiration deadline has passed.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Adds a line, merging quantities when the product is already present.
    ///
    /// A merge sums the quantities (saturating) and keeps the incoming
    /// price and name snapshot, which is the fresher of the two. A line
    /// grown past [`MAX_LINE_QUANTITY`] is caught when a fulfillment
    /// request is built from it.
    pub fn add_line(&mut self, line: CartLine, now: DateTime<Utc>, ttl: Duration) {
        let merged = match self.items.get(&line.product_id) {
            Some(existing) => CartLine {
                quantity: existing.quantity.saturating_add(line.quantity),
                ..line
            },
            None => line,
        };
        self.items.insert(merged.product_id, merged);
        self.touch(now, ttl);
    }

    /// Removes a line. Removing an absent line is not an error.
    pub fn remove_line(&mut self, product_id: ProductId, now: DateTime<Utc>, ttl: Duration) {
        self.items.remove(&product_id);
        self.touch(now, ttl);
    }

    /// Sets a line's quantity.
    ///
    /// A quantity of zero behaves exactly like [`Cart::remove_line`]. A
    /// positive quantity for an absent line is an error.
    pub fn set_line_quantity(
        &mut self,
        product_id: ProductId,
        quantity: u32,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<(), DomainError> {
        if quantity == 0 {
            self.remove_line(product_id, now, ttl);
            return Ok(());
        }
        if quantity > MAX_LINE_QUANTITY {
            return Err(DomainError::ExcessiveQuantity(quantity));
        }
        match self.items.get_mut(&product_id) {
            Some(line) => {
                line.quantity = quantity;
                self.touch(now, ttl);
                Ok(())
            }
            None => Err(DomainError::LineNotFound(product_id)),
        }
    }

    /// Empties the line map; the cart record itself survives.
    pub fn clear(&mut self, now: DateTime<Utc>, ttl: Duration) {
        self.items.clear();
        self.touch(now, ttl);
    }

    fn touch(&mut self, now: DateTime<Utc>, ttl: Duration) {
        self.updated_at = now;
        self.expires_at = now + ttl;
    }
}

mod items_as_pairs {
    use std::collections::BTreeMap;

    use common::ProductId;
    use serde::{Deserialize, Deserializer, Serializer};

    use super::CartLine;

    pub fn serialize<S>(
        items: &BTreeMap<ProductId, CartLine>,
        serializer: S,
    ) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_seq(items.iter())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<BTreeMap<ProductId, CartLine>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let pairs = Vec::<(ProductId, CartLine)>::deserialize(deserializer)?;
        Ok(pairs.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window() -> Duration {
        Duration::days(7)
    }

    fn line(product: i64, quantity: u32, cents: i64) -> CartLine {
        CartLine::new(
            ProductId::new(product),
            quantity,
            Money::from_cents(cents),
            "Widget",
        )
        .unwrap()
    }

    #[test]
    fn test_new_cart_is_empty_with_full_window() {
        let now = Utc::now();
        let cart = Cart::new(UserId::new(1), now, window());

        assert!(cart.is_empty());
        assert_eq!(cart.created_at(), now);
        assert_eq!(cart.updated_at(), now);
        assert_eq!(cart.expires_at(), now + window());
        assert!(!cart.is_expired(now));
    }

    #[test]
    fn test_add_line_inserts_new_product() {
        let now = Utc::now();
        let mut cart = Cart::new(UserId::new(1), now, window());

        cart.add_line(line(7, 2, 1000), now, window());

        assert_eq!(cart.line_count(), 1);
        let stored = cart.line(ProductId::new(7)).unwrap();
        assert_eq!(stored.quantity, 2);
        assert_eq!(stored.unit_price, Money::from_cents(1000));
    }

    #[test]
    fn test_add_line_merges_quantities() {
        let now = Utc::now();
        let mut cart = Cart::new(UserId::new(1), now, window());

        cart.add_line(line(7, 2, 1000), now, window());
        cart.add_line(line(7, 3, 1100), now, window());

        assert_eq!(cart.line_count(), 1);
        let stored = cart.line(ProductId::new(7)).unwrap();
        assert_eq!(stored.quantity, 5);
        // The merge keeps the incoming snapshot.
        assert_eq!(stored.unit_price, Money::from_cents(1100));
    }

    #[test]
    fn test_remove_absent_line_is_not_an_error() {
        let now = Utc::now();
        let mut cart = Cart::new(UserId::new(1), now, window());

        cart.remove_line(ProductId::new(99), now, window());

        assert!(cart.is_empty());
    }

    #[test]
    fn test_set_quantity_updates_line() {
        let now = Utc::now();
        let mut cart = Cart::new(UserId::new(1), now, window());
        cart.add_line(line(7, 2, 1000), now, window());

        cart.set_line_quantity(ProductId::new(7), 9, now, window())
            .unwrap();

        assert_eq!(cart.line(ProductId::new(7)).unwrap().quantity, 9);
    }

    #[test]
    fn test_set_quantity_zero_removes_line() {
        let now = Utc::now();
        let mut cart = Cart::new(UserId::new(1), now, window());
        cart.add_line(line(7, 2, 1000), now, window());

        cart.set_line_quantity(ProductId::new(7), 0, now, window())
            .unwrap();

        assert!(cart.line(ProductId::new(7)).is_none());
    }

    #[test]
    fn test_set_quantity_zero_on_absent_line_is_ok() {
        let now = Utc::now();
        let mut cart = Cart::new(UserId::new(1), now, window());

        let result = cart.set_line_quantity(ProductId::new(7), 0, now, window());

        assert_eq!(result, Ok(()));
    }

    #[test]
    fn test_set_positive_quantity_on_absent_line_errors() {
        let now = Utc::now();
        let mut cart = Cart::new(UserId::new(1), now, window());

        let result = cart.set_line_quantity(ProductId::new(7), 3, now, window());

        assert_eq!(result, Err(DomainError::LineNotFound(ProductId::new(7))));
    }

    #[test]
    fn test_clear_empties_lines_but_keeps_cart() {
        let now = Utc::now();
        let mut cart = Cart::new(UserId::new(1), now, window());
        cart.add_line(line(7, 2, 1000), now, window());
        cart.add_line(line(8, 1, 500), now, window());

        cart.clear(now, window());

        assert!(cart.is_empty());
        assert_eq!(cart.user_id(), UserId::new(1));
    }

    #[test]
    fn test_mutation_slides_expiration_window() {
        let created = Utc::now();
        let mut cart = Cart::new(UserId::new(1), created, window());

        let later = created + Duration::days(3);
        cart.add_line(line(7, 1, 1000), later, window());

        assert_eq!(cart.updated_at(), later);
        assert_eq!(cart.expires_at(), later + window());
        assert_eq!(cart.created_at(), created);
    }

    #[test]
    fn test_is_expired_at_deadline() {
        let now = Utc::now();
        let cart = Cart::new(UserId::new(1), now, window());

        assert!(cart.is_expired(now + window()));
        assert!(!cart.is_expired(now + window() - Duration::seconds(1)));
    }

    #[test]
    fn test_cart_line_rejects_zero_quantity() {
        let result = CartLine::new(ProductId::new(1), 0, Money::from_cents(100), "Widget");
        assert_eq!(result, Err(DomainError::InvalidQuantity(0)));
    }

    #[test]
    fn test_cart_line_rejects_quantity_above_stock_range() {
        let result = CartLine::new(
            ProductId::new(1),
            3_000_000_000,
            Money::from_cents(100),
            "Widget",
        );
        assert_eq!(result, Err(DomainError::ExcessiveQuantity(3_000_000_000)));
        assert!(
            CartLine::new(
                ProductId::new(1),
                MAX_LINE_QUANTITY,
                Money::from_cents(100),
                "Widget",
            )
            .is_ok()
        );
    }

    #[test]
    fn test_set_quantity_above_stock_range_errors() {
        let now = Utc::now();
        let mut cart = Cart::new(UserId::new(1), now, window());
        cart.add_line(line(7, 2, 1000), now, window());

        let result = cart.set_line_quantity(ProductId::new(7), 3_000_000_000, now, window());

        assert_eq!(result, Err(DomainError::ExcessiveQuantity(3_000_000_000)));
        assert_eq!(cart.line(ProductId::new(7)).unwrap().quantity, 2);
    }

    #[test]
    fn test_cart_line_rejects_negative_price() {
        let result = CartLine::new(ProductId::new(1), 1, Money::from_cents(-1), "Widget");
        assert_eq!(
            result,
            Err(DomainError::NegativePrice(Money::from_cents(-1)))
        );
    }

    #[test]
    fn test_line_total() {
        assert_eq!(line(1, 3, 250).line_total(), Money::from_cents(750));
    }

    #[test]
    fn test_serialization_roundtrip_keeps_lines_as_pairs() {
        let now = Utc::now();
        let mut cart = Cart::new(UserId::new(42), now, window());
        cart.add_line(line(2, 1, 500), now, window());
        cart.add_line(line(1, 4, 1250), now, window());

        let json = serde_json::to_value(&cart).unwrap();
        let items = json.get("items").unwrap().as_array().unwrap();
        assert_eq!(items.len(), 2);
        // Ordered pairs, lowest product id first.
        assert_eq!(items[0][0], 1);
        assert_eq!(items[0][1]["quantity"], 4);

        let back: Cart = serde_json::from_value(json).unwrap();
        assert_eq!(back, cart);
    }
}
