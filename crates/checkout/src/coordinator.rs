//! Cart checkout orchestration.

use cart_store::CartStore;
use common::CartId;
use domain::{CreateOrderRequest, LineRequest, Order};
use order_store::OrderStore;

use crate::{CheckoutError, Result};

/// Converts a cart into a committed order.
///
/// The coordinator forwards only `{product_id, quantity}` from the cart's
/// lines; the cached price and name snapshots are deliberately dropped so
/// the fulfillment engine re-validates and re-prices everything against
/// live inventory.
pub struct CheckoutCoordinator<C, O> {
    carts: C,
    orders: O,
}

impl<C, O> CheckoutCoordinator<C, O>
where
    C: CartStore,
    O: OrderStore,
{
    pub fn new(carts: C, orders: O) -> Self {
        Self { carts, orders }
    }

    /// Checks out the cart: load, validate non-empty, commit the order,
    /// retire the cart.
    ///
    /// An engine failure propagates verbatim with the cart left intact, so
    /// the customer can adjust quantities and retry. Once the order is
    /// committed, a failure to delete the cart is logged and swallowed:
    /// cart cleanup is hygiene, not correctness.
    #[tracing::instrument(skip(self))]
    pub async fn execute(&self, cart_id: CartId) -> Result<Order> {
        metrics::counter!("checkouts_started_total").increment(1);
        let start = std::time::Instant::now();

        let cart = self
            .carts
            .find_by_id(cart_id)
            .await
            .map_err(|error| CheckoutError::from_cart_lookup(cart_id, error))?;

        if cart.is_empty() {
            metrics::counter!("checkouts_failed_total").increment(1);
            return Err(CheckoutError::EmptyCart);
        }

        let request = CreateOrderRequest::new(
            Some(cart.user_id()),
            cart.lines()
                .map(|line| LineRequest::new(line.product_id, line.quantity)),
        )?;

        let order = match self.orders.create(request).await {
            Ok(order) => order,
            Err(error) => {
                metrics::counter!("checkouts_failed_total").increment(1);
                return Err(error.into());
            }
        };

        if let Err(error) = self.carts.delete(cart_id).await {
            tracing::warn!(
                %cart_id,
                order_id = %order.id,
                %error,
                "order committed but cart cleanup failed"
            );
        }

        metrics::counter!("checkouts_completed_total").increment(1);
        metrics::histogram!("checkout_duration_seconds").record(start.elapsed().as_secs_f64());
        tracing::info!(%cart_id, order_id = %order.id, total = %order.total_price, "checkout completed");

        Ok(order)
    }
}
