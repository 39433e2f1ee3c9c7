use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use common::{OrderId, ProductId, UserId};
use domain::{CreateOrderRequest, Money, NewProduct, Order, OrderLine, Product};
use tokio::sync::RwLock;

use crate::{InventoryLedger, OrderStore, OrderStoreError, Result};

#[derive(Debug, Default)]
struct State {
    products: BTreeMap<ProductId, Product>,
    orders: BTreeMap<OrderId, Order>,
    next_product_id: i64,
    next_order_id: i64,
    next_line_id: i64,
    fail_on_create: bool,
}

/// In-memory order store and inventory ledger for testing.
///
/// [`OrderStore::create`] holds the single write lock for its whole
/// validate-insert-decrement sequence, which is a serial execution and
/// therefore trivially serializable.
#[derive(Clone, Default)]
pub struct InMemoryOrderStore {
    state: Arc<RwLock<State>>,
}

impl InMemoryOrderStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures [`OrderStore::create`] to fail with a store error.
    pub async fn set_fail_on_create(&self, fail: bool) {
        self.state.write().await.fail_on_create = fail;
    }

    /// Returns the number of committed orders.
    pub async fn order_count(&self) -> usize {
        self.state.read().await.orders.len()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn create(&self, request: CreateOrderRequest) -> Result<Order> {
        let mut state = self.state.write().await;
        if state.fail_on_create {
            return Err(OrderStoreError::Store("injected create failure".to_string()));
        }

        // Validate every line against current product state before touching
        // anything, so a failure leaves no trace.
        let mut unavailable = Vec::new();
        let mut insufficient_stock = Vec::new();
        let mut total = Money::zero();
        for line in request.lines() {
            match state.products.get(&line.product_id) {
                None => unavailable.push(line.product_id),
                Some(product) if !product.is_available => unavailable.push(line.product_id),
                Some(product) if i64::from(product.stock) < i64::from(line.quantity) => {
                    insufficient_stock.push(line.product_id);
                }
                Some(product) => {
                    total += product.price.multiply(line.quantity);
                }
            }
        }
        if !unavailable.is_empty() || !insufficient_stock.is_empty() {
            return Err(OrderStoreError::Validation {
                unavailable,
                insufficient_stock,
            });
        }

        let now = Utc::now();
        state.next_order_id += 1;
        let order_id = OrderId::new(state.next_order_id);

        let mut lines = Vec::with_capacity(request.lines().len());
        for line in request.lines() {
            state.next_line_id += 1;
            let line_id = state.next_line_id;

            let product = state
                .products
                .get_mut(&line.product_id)
                .ok_or(OrderStoreError::ProductNotFound(line.product_id))?;
            lines.push(OrderLine {
                id: line_id,
                order_id,
                product_id: line.product_id,
                quantity: line.quantity,
                unit_price: product.price,
                created_at: now,
                updated_at: now,
            });

            product.stock -= line.quantity as i32;
            if product.stock <= 0 {
                product.is_available = false;
            }
            product.updated_at = now;
        }

        let order = Order {
            id: order_id,
            user_id: request.user_id(),
            total_price: total,
            created_at: now,
            updated_at: now,
            lines,
        };
        state.orders.insert(order_id, order.clone());
        Ok(order)
    }

    async fn find_by_id(&self, order_id: OrderId) -> Result<Order> {
        self.state
            .read()
            .await
            .orders
            .get(&order_id)
            .cloned()
            .ok_or(OrderStoreError::OrderNotFound(order_id))
    }

    async fn find_all(&self) -> Result<Vec<Order>> {
        Ok(self.state.read().await.orders.values().cloned().collect())
    }

    async fn find_by_user_id(&self, user_id: UserId) -> Result<Vec<Order>> {
        Ok(self
            .state
            .read()
            .await
            .orders
            .values()
            .filter(|order| order.user_id == Some(user_id))
            .cloned()
            .collect())
    }

    async fn delete(&self, order_id: OrderId) -> Result<()> {
        self.state
            .write()
            .await
            .orders
            .remove(&order_id)
            .map(|_| ())
            .ok_or(OrderStoreError::OrderNotFound(order_id))
    }
}

#[async_trait]
impl InventoryLedger for InMemoryOrderStore {
    async fn insert_product(&self, product: NewProduct) -> Result<Product> {
        let mut state = self.state.write().await;
        let now = Utc::now();
        state.next_product_id += 1;

        let product = Product {
            id: ProductId::new(state.next_product_id),
            name: product.name,
            description: product.description,
            price: product.price,
            stock: product.stock,
            is_available: product.stock > 0,
            created_at: now,
            updated_at: now,
        };
        state.products.insert(product.id, product.clone());
        Ok(product)
    }

    async fn find_product(&self, product_id: ProductId) -> Result<Product> {
        self.state
            .read()
            .await
            .products
            .get(&product_id)
            .cloned()
            .ok_or(OrderStoreError::ProductNotFound(product_id))
    }

    async fn list_products(&self) -> Result<Vec<Product>> {
        Ok(self.state.read().await.products.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::LineRequest;

    async fn seed_product(store: &InMemoryOrderStore, cents: i64, stock: i32) -> ProductId {
        store
            .insert_product(NewProduct::new("Widget", None, Money::from_cents(cents), stock).unwrap())
            .await
            .unwrap()
            .id
    }

    fn request(user: Option<i64>, lines: &[(ProductId, u32)]) -> CreateOrderRequest {
        CreateOrderRequest::new(
            user.map(UserId::new),
            lines
                .iter()
                .map(|(product_id, quantity)| LineRequest::new(*product_id, *quantity)),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_create_prices_from_ledger() {
        let store = InMemoryOrderStore::new();
        let widget = seed_product(&store, 1000, 10).await;
        let gadget = seed_product(&store, 2500, 5).await;

        let order = store
            .create(request(Some(1), &[(widget, 2), (gadget, 1)]))
            .await
            .unwrap();

        assert_eq!(order.lines.len(), 2);
        assert_eq!(order.total_price, Money::from_cents(4500));
        assert!(order.total_is_consistent());

        // Stock decremented.
        assert_eq!(store.find_product(widget).await.unwrap().stock, 8);
        assert_eq!(store.find_product(gadget).await.unwrap().stock, 4);
    }

    #[tokio::test]
    async fn test_exhausting_stock_flips_availability() {
        let store = InMemoryOrderStore::new();
        let widget = seed_product(&store, 1000, 3).await;

        store.create(request(Some(1), &[(widget, 3)])).await.unwrap();

        let product = store.find_product(widget).await.unwrap();
        assert_eq!(product.stock, 0);
        assert!(!product.is_available);
    }

    #[tokio::test]
    async fn test_one_bad_line_leaves_no_trace() {
        let store = InMemoryOrderStore::new();
        let widget = seed_product(&store, 1000, 10).await;
        let scarce = seed_product(&store, 500, 1).await;

        let result = store
            .create(request(Some(1), &[(widget, 2), (scarce, 5)]))
            .await;

        assert!(matches!(
            result,
            Err(OrderStoreError::Validation { ref insufficient_stock, .. })
                if insufficient_stock == &[scarce]
        ));
        assert_eq!(store.order_count().await, 0);
        // Stock of the valid line is untouched too.
        assert_eq!(store.find_product(widget).await.unwrap().stock, 10);
    }

    #[tokio::test]
    async fn test_quantity_at_the_cap_fails_stock_validation() {
        let store = InMemoryOrderStore::new();
        let widget = seed_product(&store, 1000, 5).await;

        let result = store
            .create(request(Some(1), &[(widget, domain::MAX_LINE_QUANTITY)]))
            .await;

        assert!(matches!(
            result,
            Err(OrderStoreError::Validation { ref insufficient_stock, .. })
                if insufficient_stock == &[widget]
        ));
        assert_eq!(store.order_count().await, 0);
        assert_eq!(store.find_product(widget).await.unwrap().stock, 5);
    }

    #[tokio::test]
    async fn test_unknown_product_is_unavailable() {
        let store = InMemoryOrderStore::new();
        let ghost = ProductId::new(999);

        let result = store.create(request(None, &[(ghost, 1)])).await;

        assert!(matches!(
            result,
            Err(OrderStoreError::Validation { ref unavailable, .. }) if unavailable == &[ghost]
        ));
    }

    #[tokio::test]
    async fn test_second_request_for_same_stock_fails() {
        let store = InMemoryOrderStore::new();
        let widget = seed_product(&store, 1000, 5).await;

        store.create(request(Some(1), &[(widget, 5)])).await.unwrap();
        let result = store.create(request(Some(2), &[(widget, 5)])).await;

        assert!(matches!(result, Err(OrderStoreError::Validation { .. })));
        assert_eq!(store.order_count().await, 1);
    }

    #[tokio::test]
    async fn test_guest_orders_are_first_class() {
        let store = InMemoryOrderStore::new();
        let widget = seed_product(&store, 1000, 10).await;

        let order = store.create(request(None, &[(widget, 1)])).await.unwrap();
        assert_eq!(order.user_id, None);

        // Lookup by id works; user lookup never matches guests.
        assert_eq!(store.find_by_id(order.id).await.unwrap().id, order.id);
        assert!(store.find_by_user_id(UserId::new(1)).await.unwrap().is_empty());
        assert_eq!(store.find_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_find_by_user_with_no_orders_is_empty() {
        let store = InMemoryOrderStore::new();
        let orders = store.find_by_user_id(UserId::new(7)).await.unwrap();
        assert!(orders.is_empty());
    }

    #[tokio::test]
    async fn test_delete_cascades() {
        let store = InMemoryOrderStore::new();
        let widget = seed_product(&store, 1000, 10).await;
        let order = store.create(request(Some(1), &[(widget, 1)])).await.unwrap();

        store.delete(order.id).await.unwrap();

        assert!(matches!(
            store.find_by_id(order.id).await,
            Err(OrderStoreError::OrderNotFound(_))
        ));
        assert!(matches!(
            store.delete(order.id).await,
            Err(OrderStoreError::OrderNotFound(_))
        ));
    }
}
