use async_trait::async_trait;
use common::{OrderId, UserId};
use domain::{CreateOrderRequest, Order};

use crate::Result;

/// The order fulfillment engine.
///
/// [`OrderStore::create`] is the only path that commits orders and the only
/// code anywhere allowed to mutate stock. Its effects are all-or-nothing:
/// either the order row, every line row, and every stock decrement commit
/// together, or none of them do and no other reader ever sees a trace.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Atomically validates, prices, and commits an order.
    ///
    /// Every requested line must be satisfiable (`is_available` and enough
    /// stock) against a transaction-consistent snapshot; otherwise the
    /// whole unit of work aborts with a validation error naming the
    /// offending products. Prices come from the same snapshot, never from
    /// the caller. Stock decrements flip `is_available` off at zero and
    /// can never drive stock negative.
    async fn create(&self, request: CreateOrderRequest) -> Result<Order>;

    /// Loads an order with its lines.
    async fn find_by_id(&self, order_id: OrderId) -> Result<Order>;

    /// Loads every order with its lines.
    async fn find_all(&self) -> Result<Vec<Order>>;

    /// Loads a user's orders. No orders is an empty list, not an error;
    /// guest orders never match.
    async fn find_by_user_id(&self, user_id: UserId) -> Result<Vec<Order>>;

    /// Deletes an order, cascading to its lines in one transaction.
    async fn delete(&self, order_id: OrderId) -> Result<()>;
}
