//! Ledger-enriched cart use cases.

use cart_store::CartStore;
use common::{CartId, ProductId, UserId};
use domain::{Cart, CartLine, LineRequest};
use order_store::InventoryLedger;

use crate::{CheckoutError, Result};

/// Cart operations that need the inventory ledger.
///
/// API requests carry only `{product_id, quantity}`; this service resolves
/// the live price and display name from the ledger into the stored line
/// snapshot, and runs an advisory availability check. The advisory check
/// improves the error a customer sees while editing; the fulfillment
/// engine's transactional validation remains the only authority at
/// checkout.
pub struct CartService<C, L> {
    carts: C,
    ledger: L,
}

impl<C, L> CartService<C, L>
where
    C: CartStore,
    L: InventoryLedger,
{
    pub fn new(carts: C, ledger: L) -> Self {
        Self { carts, ledger }
    }

    /// Creates a cart, optionally seeded with initial lines.
    ///
    /// Every initial line is resolved against the ledger first; if adding
    /// any of them fails, the just-created cart is deleted again so a
    /// failed request leaves nothing behind.
    #[tracing::instrument(skip(self, initial_lines))]
    pub async fn create_cart(
        &self,
        user_id: UserId,
        initial_lines: Vec<LineRequest>,
    ) -> Result<Cart> {
        let mut cart = self.carts.create(user_id).await?;

        for request in initial_lines {
            match self.resolve_line(request).await {
                Ok(line) => match self.carts.add_item(cart.id(), line).await {
                    Ok(updated) => cart = updated,
                    Err(error) => {
                        self.compensate_create(cart.id()).await;
                        return Err(error.into());
                    }
                },
                Err(error) => {
                    self.compensate_create(cart.id()).await;
                    return Err(error);
                }
            }
        }

        metrics::counter!("carts_created_total").increment(1);
        Ok(cart)
    }

    /// Adds a line with price and name snapshotted from the ledger.
    #[tracing::instrument(skip(self))]
    pub async fn add_item(
        &self,
        cart_id: CartId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<Cart> {
        let line = self
            .resolve_line(LineRequest::new(product_id, quantity))
            .await?;
        Ok(self.carts.add_item(cart_id, line).await?)
    }

    pub async fn find_by_id(&self, cart_id: CartId) -> Result<Cart> {
        self.carts
            .find_by_id(cart_id)
            .await
            .map_err(|error| CheckoutError::from_cart_lookup(cart_id, error))
    }

    pub async fn find_by_user_id(&self, user_id: UserId) -> Result<Cart> {
        Ok(self.carts.find_by_user_id(user_id).await?)
    }

    pub async fn remove_item(&self, cart_id: CartId, product_id: ProductId) -> Result<Cart> {
        Ok(self.carts.remove_item(cart_id, product_id).await?)
    }

    pub async fn update_item_quantity(
        &self,
        cart_id: CartId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<Cart> {
        Ok(self
            .carts
            .update_item_quantity(cart_id, product_id, quantity)
            .await?)
    }

    pub async fn clear(&self, cart_id: CartId) -> Result<()> {
        Ok(self.carts.clear(cart_id).await?)
    }

    pub async fn delete(&self, cart_id: CartId) -> Result<()> {
        Ok(self.carts.delete(cart_id).await?)
    }

    /// Resolves a requested line into a stored [`CartLine`] with the
    /// ledger's current price and name.
    async fn resolve_line(&self, request: LineRequest) -> Result<CartLine> {
        let product = match self.ledger.find_product(request.product_id).await {
            Ok(product) => product,
            Err(order_store::OrderStoreError::ProductNotFound(id)) => {
                return Err(CheckoutError::ProductUnavailable(id));
            }
            Err(error) => return Err(error.into()),
        };

        if !product.is_available {
            return Err(CheckoutError::ProductUnavailable(product.id));
        }
        if i64::from(product.stock) < i64::from(request.quantity) {
            return Err(CheckoutError::InsufficientStock {
                product_id: product.id,
                requested: request.quantity,
                available: product.stock,
            });
        }

        Ok(CartLine::new(
            product.id,
            request.quantity,
            product.price,
            product.name,
        )?)
    }

    async fn compensate_create(&self, cart_id: CartId) {
        if let Err(error) = self.carts.delete(cart_id).await {
            tracing::warn!(%cart_id, %error, "failed to delete cart after aborted create");
        }
    }
}
