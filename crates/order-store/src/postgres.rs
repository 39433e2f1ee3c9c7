use std::collections::HashMap;

use async_trait::async_trait;
use common::{OrderId, ProductId, UserId};
use domain::{CreateOrderRequest, Money, NewProduct, Order, OrderLine, Product};
use sqlx::{PgPool, Row, postgres::PgRow};

use crate::{
    InventoryLedger, OrderStore, OrderStoreError, Result, RetryPolicy,
    retry::is_serialization_conflict,
};

/// PostgreSQL-backed order store and inventory ledger.
///
/// Order creation runs one serializable transaction: read the product
/// rows, validate, insert the order and its lines at the prices observed
/// in that same snapshot, decrement stock. Serializable isolation makes
/// overlapping checkouts conflict instead of both passing validation, so
/// the whole transaction is wrapped in a bounded retry loop.
#[derive(Clone)]
pub struct PostgresOrderStore {
    pool: PgPool,
    retry: RetryPolicy,
}

impl PostgresOrderStore {
    /// Creates an order store over an existing pool with the default
    /// retry policy.
    pub fn new(pool: PgPool) -> Self {
        Self::with_retry(pool, RetryPolicy::default())
    }

    /// Creates an order store with an explicit retry policy.
    pub fn with_retry(pool: PgPool, retry: RetryPolicy) -> Self {
        Self { pool, retry }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_product(row: PgRow) -> Result<Product> {
        Ok(Product {
            id: ProductId::new(row.try_get("id")?),
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            price: Money::from_cents(row.try_get("price")?),
            stock: row.try_get("stock")?,
            is_available: row.try_get("is_available")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn row_to_line(row: PgRow) -> Result<OrderLine> {
        Ok(OrderLine {
            id: row.try_get("id")?,
            order_id: OrderId::new(row.try_get("order_id")?),
            product_id: ProductId::new(row.try_get("product_id")?),
            quantity: row.try_get::<i32, _>("quantity")? as u32,
            unit_price: Money::from_cents(row.try_get("price_at_purchase")?),
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn row_to_order(row: PgRow, lines: Vec<OrderLine>) -> Result<Order> {
        Ok(Order {
            id: OrderId::new(row.try_get("id")?),
            user_id: row.try_get::<Option<i64>, _>("user_id")?.map(UserId::new),
            total_price: Money::from_cents(row.try_get("total_price")?),
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            lines,
        })
    }

    async fn lines_for_order(&self, order_id: OrderId) -> Result<Vec<OrderLine>> {
        let rows = sqlx::query(
            r#"
            SELECT id, order_id, product_id, quantity, price_at_purchase, created_at, updated_at
            FROM order_items
            WHERE order_id = $1
            ORDER BY id ASC
            "#,
        )
        .bind(order_id.as_i64())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_line).collect()
    }

    async fn orders_with_lines(&self, order_rows: Vec<PgRow>) -> Result<Vec<Order>> {
        let ids: Vec<i64> = order_rows
            .iter()
            .map(|row| row.try_get("id"))
            .collect::<std::result::Result<_, sqlx::Error>>()?;

        let line_rows = sqlx::query(
            r#"
            SELECT id, order_id, product_id, quantity, price_at_purchase, created_at, updated_at
            FROM order_items
            WHERE order_id = ANY($1)
            ORDER BY id ASC
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut lines_by_order: HashMap<OrderId, Vec<OrderLine>> = HashMap::new();
        for row in line_rows {
            let line = Self::row_to_line(row)?;
            lines_by_order.entry(line.order_id).or_default().push(line);
        }

        order_rows
            .into_iter()
            .map(|row| {
                let order_id = OrderId::new(row.try_get("id")?);
                let lines = lines_by_order.remove(&order_id).unwrap_or_default();
                Self::row_to_order(row, lines)
            })
            .collect()
    }

    /// One serializable attempt at committing the order.
    async fn try_create(&self, request: &CreateOrderRequest) -> Result<Order> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
            .execute(&mut *tx)
            .await?;

        // Join the requested lines against product state inside this
        // transaction.
        let ids: Vec<i64> = request
            .lines()
            .iter()
            .map(|line| line.product_id.as_i64())
            .collect();
        let product_rows =
            sqlx::query("SELECT id, price, stock, is_available FROM products WHERE id = ANY($1)")
                .bind(&ids)
                .fetch_all(&mut *tx)
                .await?;

        let mut products: HashMap<i64, (i64, i32, bool)> = HashMap::new();
        for row in product_rows {
            products.insert(
                row.try_get("id")?,
                (
                    row.try_get("price")?,
                    row.try_get("stock")?,
                    row.try_get("is_available")?,
                ),
            );
        }

        let mut unavailable = Vec::new();
        let mut insufficient_stock = Vec::new();
        let mut total = Money::zero();
        for line in request.lines() {
            match products.get(&line.product_id.as_i64()) {
                None => unavailable.push(line.product_id),
                Some((_, _, false)) => unavailable.push(line.product_id),
                Some((_, stock, true)) if i64::from(*stock) < i64::from(line.quantity) => {
                    insufficient_stock.push(line.product_id);
                }
                Some((price, _, true)) => {
                    total += Money::from_cents(*price).multiply(line.quantity);
                }
            }
        }

        // Any invalid line aborts the whole unit of work; the dropped
        // transaction rolls back and nothing persists.
        if !unavailable.is_empty() || !insufficient_stock.is_empty() {
            return Err(OrderStoreError::Validation {
                unavailable,
                insufficient_stock,
            });
        }

        let order_row = sqlx::query(
            r#"
            INSERT INTO orders (user_id, total_price)
            VALUES ($1, $2)
            RETURNING id, user_id, total_price, created_at, updated_at
            "#,
        )
        .bind(request.user_id().map(|user| user.as_i64()))
        .bind(total.cents())
        .fetch_one(&mut *tx)
        .await?;
        let order_id: i64 = order_row.try_get("id")?;

        let mut lines = Vec::with_capacity(request.lines().len());
        for line in request.lines() {
            let (price, _, _) = products[&line.product_id.as_i64()];
            let line_row = sqlx::query(
                r#"
                INSERT INTO order_items (order_id, product_id, quantity, price_at_purchase)
                VALUES ($1, $2, $3, $4)
                RETURNING id, order_id, product_id, quantity, price_at_purchase, created_at, updated_at
                "#,
            )
            .bind(order_id)
            .bind(line.product_id.as_i64())
            .bind(line.quantity as i32)
            .bind(price)
            .fetch_one(&mut *tx)
            .await?;
            lines.push(Self::row_to_line(line_row)?);

            // The CHECK constraint on stock backstops the validation above;
            // under serializable isolation it never fires.
            sqlx::query(
                r#"
                UPDATE products
                SET stock = stock - $2,
                    is_available = (stock - $2) > 0,
                    updated_at = NOW()
                WHERE id = $1
                "#,
            )
            .bind(line.product_id.as_i64())
            .bind(line.quantity as i32)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Self::row_to_order(order_row, lines)
    }
}

#[async_trait]
impl OrderStore for PostgresOrderStore {
    #[tracing::instrument(skip(self, request), fields(lines = request.lines().len()))]
    async fn create(&self, request: CreateOrderRequest) -> Result<Order> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.try_create(&request).await {
                Ok(order) => {
                    metrics::counter!("orders_created_total").increment(1);
                    tracing::info!(order_id = %order.id, total = %order.total_price, "order committed");
                    return Ok(order);
                }
                Err(OrderStoreError::Database(error)) if is_serialization_conflict(&error) => {
                    metrics::counter!("order_transaction_retries_total").increment(1);
                    if attempt >= self.retry.max_attempts {
                        tracing::warn!(attempt, "order transaction conflict, retries exhausted");
                        return Err(OrderStoreError::TransactionConflict { attempts: attempt });
                    }
                    let delay = self.retry.delay_for(attempt);
                    tracing::debug!(attempt, ?delay, "order transaction conflict, retrying");
                    tokio::time::sleep(delay).await;
                }
                Err(error) => {
                    if matches!(error, OrderStoreError::Validation { .. }) {
                        metrics::counter!("orders_rejected_total").increment(1);
                    }
                    return Err(error);
                }
            }
        }
    }

    async fn find_by_id(&self, order_id: OrderId) -> Result<Order> {
        let row = sqlx::query(
            "SELECT id, user_id, total_price, created_at, updated_at FROM orders WHERE id = $1",
        )
        .bind(order_id.as_i64())
        .fetch_optional(&self.pool)
        .await?
        .ok_or(OrderStoreError::OrderNotFound(order_id))?;

        let lines = self.lines_for_order(order_id).await?;
        Self::row_to_order(row, lines)
    }

    async fn find_all(&self) -> Result<Vec<Order>> {
        let rows = sqlx::query(
            "SELECT id, user_id, total_price, created_at, updated_at FROM orders ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        self.orders_with_lines(rows).await
    }

    async fn find_by_user_id(&self, user_id: UserId) -> Result<Vec<Order>> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, total_price, created_at, updated_at
            FROM orders
            WHERE user_id = $1
            ORDER BY id ASC
            "#,
        )
        .bind(user_id.as_i64())
        .fetch_all(&self.pool)
        .await?;

        self.orders_with_lines(rows).await
    }

    #[tracing::instrument(skip(self))]
    async fn delete(&self, order_id: OrderId) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM order_items WHERE order_id = $1")
            .bind(order_id.as_i64())
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(order_id.as_i64())
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(OrderStoreError::OrderNotFound(order_id));
        }

        tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl InventoryLedger for PostgresOrderStore {
    #[tracing::instrument(skip(self, product), fields(name = %product.name))]
    async fn insert_product(&self, product: NewProduct) -> Result<Product> {
        let row = sqlx::query(
            r#"
            INSERT INTO products (name, description, price, stock, is_available)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, name, description, price, stock, is_available, created_at, updated_at
            "#,
        )
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price.cents())
        .bind(product.stock)
        .bind(product.stock > 0)
        .fetch_one(&self.pool)
        .await?;

        Self::row_to_product(row)
    }

    async fn find_product(&self, product_id: ProductId) -> Result<Product> {
        let row = sqlx::query(
            r#"
            SELECT id, name, description, price, stock, is_available, created_at, updated_at
            FROM products
            WHERE id = $1
            "#,
        )
        .bind(product_id.as_i64())
        .fetch_optional(&self.pool)
        .await?
        .ok_or(OrderStoreError::ProductNotFound(product_id))?;

        Self::row_to_product(row)
    }

    async fn list_products(&self) -> Result<Vec<Product>> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, description, price, stock, is_available, created_at, updated_at
            FROM products
            ORDER BY id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_product).collect()
    }
}
