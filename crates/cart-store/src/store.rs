use async_trait::async_trait;
use common::{CartId, ProductId, UserId};
use domain::{Cart, CartLine};

use crate::Result;

/// Storage contract for ephemeral, per-customer carts.
///
/// Every mutating operation persists the cart as a whole and re-arms the
/// sliding expiration window from the mutation instant. Implementations
/// must make each mutation atomic per cart id: two concurrent mutations
/// against the same cart may interleave in either order but never lose an
/// update. Expired carts are invisible to every operation the moment their
/// deadline passes, whether or not they have been physically removed.
#[async_trait]
pub trait CartStore: Send + Sync {
    /// Allocates a fresh empty cart with a full expiration window.
    async fn create(&self, user_id: UserId) -> Result<Cart>;

    /// Loads a cart by id.
    async fn find_by_id(&self, cart_id: CartId) -> Result<Cart>;

    /// Loads a user's live cart through the user-id index.
    ///
    /// When a user somehow owns several live carts, the most recently
    /// updated one wins.
    async fn find_by_user_id(&self, user_id: UserId) -> Result<Cart>;

    /// Adds a line, merging quantities when the product is already present.
    async fn add_item(&self, cart_id: CartId, line: CartLine) -> Result<Cart>;

    /// Removes a line. Removing an absent line is not an error.
    async fn remove_item(&self, cart_id: CartId, product_id: ProductId) -> Result<Cart>;

    /// Sets a line's quantity. Zero behaves exactly like
    /// [`CartStore::remove_item`]; a positive quantity for an absent line
    /// is an error.
    async fn update_item_quantity(
        &self,
        cart_id: CartId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<Cart>;

    /// Empties the item map; the cart record itself survives.
    async fn clear(&self, cart_id: CartId) -> Result<()>;

    /// Removes the cart record entirely.
    async fn delete(&self, cart_id: CartId) -> Result<()>;

    /// Physically removes expired cart records, returning how many.
    async fn purge_expired(&self) -> Result<u64>;
}
