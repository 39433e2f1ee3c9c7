use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use common::{CartId, ProductId, UserId};
use domain::{Cart, CartLine};
use tokio::sync::RwLock;

use crate::{CartStore, CartStoreError, Result};

#[derive(Debug, Default)]
struct State {
    carts: HashMap<CartId, Cart>,
    by_user: HashMap<UserId, Vec<CartId>>,
    fail_on_write: bool,
    fail_on_delete: bool,
}

/// In-memory cart store for testing.
///
/// The whole read-modify-write of every mutation runs under one write
/// lock, matching the per-cart atomicity the Postgres backend gets from
/// its row lock. Expiry is lazy: reads treat expired carts as absent and
/// [`CartStore::purge_expired`] removes them physically.
#[derive(Clone)]
pub struct InMemoryCartStore {
    state: Arc<RwLock<State>>,
    ttl: Duration,
}

impl InMemoryCartStore {
    /// Creates an empty store with the given sliding expiration window.
    pub fn new(ttl: Duration) -> Self {
        Self {
            state: Arc::new(RwLock::new(State::default())),
            ttl,
        }
    }

    /// Configures mutations to fail with a store error.
    pub async fn set_fail_on_write(&self, fail: bool) {
        self.state.write().await.fail_on_write = fail;
    }

    /// Configures [`CartStore::delete`] to fail with a store error.
    pub async fn set_fail_on_delete(&self, fail: bool) {
        self.state.write().await.fail_on_delete = fail;
    }

    /// Seeds a pre-built cart, e.g. one constructed with a past timestamp.
    pub async fn insert(&self, cart: Cart) {
        let mut state = self.state.write().await;
        state.by_user.entry(cart.user_id()).or_default().push(cart.id());
        state.carts.insert(cart.id(), cart);
    }

    /// Returns the number of live carts.
    pub async fn cart_count(&self) -> usize {
        let now = Utc::now();
        self.state
            .read()
            .await
            .carts
            .values()
            .filter(|c| !c.is_expired(now))
            .count()
    }

    fn live<'a>(state: &'a State, cart_id: CartId) -> Result<&'a Cart> {
        state
            .carts
            .get(&cart_id)
            .filter(|c| !c.is_expired(Utc::now()))
            .ok_or(CartStoreError::NotFound(cart_id))
    }

    async fn mutate<F>(&self, cart_id: CartId, mutation: F) -> Result<Cart>
    where
        F: FnOnce(&mut Cart, chrono::DateTime<Utc>, Duration) -> Result<()>,
    {
        let mut state = self.state.write().await;
        if state.fail_on_write {
            return Err(CartStoreError::Store("injected write failure".to_string()));
        }

        let now = Utc::now();
        let cart = state
            .carts
            .get_mut(&cart_id)
            .filter(|c| !c.is_expired(now))
            .ok_or(CartStoreError::NotFound(cart_id))?;

        mutation(cart, now, self.ttl)?;
        Ok(cart.clone())
    }
}

#[async_trait]
impl CartStore for InMemoryCartStore {
    async fn create(&self, user_id: UserId) -> Result<Cart> {
        let mut state = self.state.write().await;
        if state.fail_on_write {
            return Err(CartStoreError::Store("injected write failure".to_string()));
        }

        let cart = Cart::new(user_id, Utc::now(), self.ttl);
        state.by_user.entry(user_id).or_default().push(cart.id());
        state.carts.insert(cart.id(), cart.clone());
        Ok(cart)
    }

    async fn find_by_id(&self, cart_id: CartId) -> Result<Cart> {
        let state = self.state.read().await;
        Self::live(&state, cart_id).cloned()
    }

    async fn find_by_user_id(&self, user_id: UserId) -> Result<Cart> {
        let state = self.state.read().await;
        let now = Utc::now();
        state
            .by_user
            .get(&user_id)
            .into_iter()
            .flatten()
            .filter_map(|id| state.carts.get(id))
            .filter(|c| !c.is_expired(now))
            .max_by_key(|c| c.updated_at())
            .cloned()
            .ok_or(CartStoreError::UserCartNotFound(user_id))
    }

    async fn add_item(&self, cart_id: CartId, line: CartLine) -> Result<Cart> {
        self.mutate(cart_id, |cart, now, ttl| {
            cart.add_line(line, now, ttl);
            Ok(())
        })
        .await
    }

    async fn remove_item(&self, cart_id: CartId, product_id: ProductId) -> Result<Cart> {
        self.mutate(cart_id, |cart, now, ttl| {
            cart.remove_line(product_id, now, ttl);
            Ok(())
        })
        .await
    }

    async fn update_item_quantity(
        &self,
        cart_id: CartId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<Cart> {
        self.mutate(cart_id, |cart, now, ttl| {
            cart.set_line_quantity(product_id, quantity, now, ttl)?;
            Ok(())
        })
        .await
    }

    async fn clear(&self, cart_id: CartId) -> Result<()> {
        self.mutate(cart_id, |cart, now, ttl| {
            cart.clear(now, ttl);
            Ok(())
        })
        .await?;
        Ok(())
    }

    async fn delete(&self, cart_id: CartId) -> Result<()> {
        let mut state = self.state.write().await;
        if state.fail_on_delete {
            return Err(CartStoreError::Store("injected delete failure".to_string()));
        }

        let cart = state
            .carts
            .remove(&cart_id)
            .filter(|c| !c.is_expired(Utc::now()))
            .ok_or(CartStoreError::NotFound(cart_id))?;

        if let Some(ids) = state.by_user.get_mut(&cart.user_id()) {
            ids.retain(|id| *id != cart_id);
        }
        Ok(())
    }

    async fn purge_expired(&self) -> Result<u64> {
        let mut state = self.state.write().await;
        let now = Utc::now();
        let expired: Vec<(CartId, UserId)> = state
            .carts
            .values()
            .filter(|c| c.is_expired(now))
            .map(|c| (c.id(), c.user_id()))
            .collect();

        for (cart_id, user_id) in &expired {
            state.carts.remove(cart_id);
            if let Some(ids) = state.by_user.get_mut(user_id) {
                ids.retain(|id| id != cart_id);
            }
        }
        Ok(expired.len() as u64)
    }
}
