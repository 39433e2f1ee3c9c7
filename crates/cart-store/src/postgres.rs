use async_trait::async_trait;
use chrono::{Duration, Utc};
use common::{CartId, ProductId, UserId};
use domain::{Cart, CartLine};
use sqlx::{PgPool, Row};

use crate::{CartStore, CartStoreError, Result};

/// PostgreSQL-backed cart store.
///
/// One row per cart: the whole cart is a JSONB payload, with `user_id` and
/// `expires_at` lifted into columns for the user index and TTL sweeping.
/// Each mutation runs in a short transaction that row-locks the cart, so
/// concurrent mutations of the same cart serialize instead of losing
/// updates.
#[derive(Clone)]
pub struct PostgresCartStore {
    pool: PgPool,
    ttl: Duration,
}

impl PostgresCartStore {
    /// Creates a cart store over an existing pool with the given sliding
    /// expiration window.
    pub fn new(pool: PgPool, ttl: Duration) -> Self {
        Self { pool, ttl }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    /// Applies `mutation` to the cart under a row lock and persists the
    /// result with a re-armed TTL.
    async fn mutate<F>(&self, cart_id: CartId, mutation: F) -> Result<Cart>
    where
        F: FnOnce(&mut Cart, chrono::DateTime<Utc>, Duration) -> Result<()>,
    {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query("SELECT payload FROM carts WHERE id = $1 AND expires_at > $2 FOR UPDATE")
            .bind(cart_id.as_uuid())
            .bind(now)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(CartStoreError::NotFound(cart_id))?;

        let payload: serde_json::Value = row.try_get("payload")?;
        let mut cart: Cart = serde_json::from_value(payload)?;

        mutation(&mut cart, now, self.ttl)?;

        sqlx::query("UPDATE carts SET payload = $2, expires_at = $3 WHERE id = $1")
            .bind(cart_id.as_uuid())
            .bind(serde_json::to_value(&cart)?)
            .bind(cart.expires_at())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(cart)
    }
}

#[async_trait]
impl CartStore for PostgresCartStore {
    #[tracing::instrument(skip(self))]
    async fn create(&self, user_id: UserId) -> Result<Cart> {
        let cart = Cart::new(user_id, Utc::now(), self.ttl);

        sqlx::query("INSERT INTO carts (id, user_id, payload, expires_at) VALUES ($1, $2, $3, $4)")
            .bind(cart.id().as_uuid())
            .bind(user_id.as_i64())
            .bind(serde_json::to_value(&cart)?)
            .bind(cart.expires_at())
            .execute(&self.pool)
            .await?;

        Ok(cart)
    }

    async fn find_by_id(&self, cart_id: CartId) -> Result<Cart> {
        let row = sqlx::query("SELECT payload FROM carts WHERE id = $1 AND expires_at > $2")
            .bind(cart_id.as_uuid())
            .bind(Utc::now())
            .fetch_optional(&self.pool)
            .await?
            .ok_or(CartStoreError::NotFound(cart_id))?;

        let payload: serde_json::Value = row.try_get("payload")?;
        Ok(serde_json::from_value(payload)?)
    }

    async fn find_by_user_id(&self, user_id: UserId) -> Result<Cart> {
        // The cast makes the comparison temporal; textual ordering misorders
        // timestamps with different subsecond digit counts.
        let row = sqlx::query(
            r#"
            SELECT payload FROM carts
            WHERE user_id = $1 AND expires_at > $2
            ORDER BY (payload->>'updated_at')::timestamptz DESC
            LIMIT 1
            "#,
        )
        .bind(user_id.as_i64())
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?
        .ok_or(CartStoreError::UserCartNotFound(user_id))?;

        let payload: serde_json::Value = row.try_get("payload")?;
        Ok(serde_json::from_value(payload)?)
    }

    #[tracing::instrument(skip(self, line), fields(product_id = %line.product_id))]
    async fn add_item(&self, cart_id: CartId, line: CartLine) -> Result<Cart> {
        self.mutate(cart_id, |cart, now, ttl| {
            cart.add_line(line, now, ttl);
            Ok(())
        })
        .await
    }

    #[tracing::instrument(skip(self))]
    async fn remove_item(&self, cart_id: CartId, product_id: ProductId) -> Result<Cart> {
        self.mutate(cart_id, |cart, now, ttl| {
            cart.remove_line(product_id, now, ttl);
            Ok(())
        })
        .await
    }

    #[tracing::instrument(skip(self))]
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

    #[tracing::instrument(skip(self))]
    async fn clear(&self, cart_id: CartId) -> Result<()> {
        self.mutate(cart_id, |cart, now, ttl| {
            cart.clear(now, ttl);
            Ok(())
        })
        .await?;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn delete(&self, cart_id: CartId) -> Result<()> {
        let result = sqlx::query("DELETE FROM carts WHERE id = $1 AND expires_at > $2")
            .bind(cart_id.as_uuid())
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(CartStoreError::NotFound(cart_id));
        }
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn purge_expired(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM carts WHERE expires_at <= $1")
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        let purged = result.rows_affected();
        if purged > 0 {
            tracing::info!(purged, "purged expired carts");
        }
        Ok(purged)
    }
}
