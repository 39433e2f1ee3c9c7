//! PostgreSQL integration tests for the fulfillment engine.
//!
//! These tests share one PostgreSQL container. Run with:
//!
//! ```bash
//! cargo test -p order-store --test postgres_integration
//! ```

use std::sync::Arc;

use common::{OrderId, ProductId, UserId};
use domain::{CreateOrderRequest, LineRequest, Money, NewProduct};
use order_store::{InventoryLedger, OrderStore, OrderStoreError, PostgresOrderStore};
use serial_test::serial;
use sqlx::PgPool;
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();
            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let temp_pool = PgPool::connect(&connection_string).await.unwrap();
            sqlx::raw_sql(include_str!("../../../migrations/001_initial_schema.sql"))
                .execute(&temp_pool)
                .await
                .unwrap();
            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Gets a fresh store with its own pool and truncated tables.
async fn get_test_store() -> PostgresOrderStore {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&info.connection_string)
        .await
        .unwrap();

    sqlx::query("TRUNCATE TABLE order_items, orders, products RESTART IDENTITY CASCADE")
        .execute(&pool)
        .await
        .unwrap();

    PostgresOrderStore::new(pool)
}

async fn seed_product(store: &PostgresOrderStore, cents: i64, stock: i32) -> ProductId {
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
#[serial]
async fn create_commits_order_lines_and_stock_together() {
    let store = get_test_store().await;
    let widget = seed_product(&store, 1000, 10).await;
    let gadget = seed_product(&store, 2500, 5).await;

    let order = store
        .create(request(Some(1), &[(widget, 2), (gadget, 1)]))
        .await
        .unwrap();

    assert_eq!(order.lines.len(), 2);
    assert_eq!(order.total_price, Money::from_cents(4500));
    assert!(order.total_is_consistent());
    assert_eq!(order.user_id, Some(UserId::new(1)));

    let reloaded = store.find_by_id(order.id).await.unwrap();
    assert_eq!(reloaded, order);

    assert_eq!(store.find_product(widget).await.unwrap().stock, 8);
    assert_eq!(store.find_product(gadget).await.unwrap().stock, 4);
}

#[tokio::test]
#[serial]
async fn create_prices_from_ledger_not_caller() {
    let store = get_test_store().await;
    let widget = seed_product(&store, 1234, 10).await;

    let order = store.create(request(None, &[(widget, 3)])).await.unwrap();

    assert_eq!(order.lines[0].unit_price, Money::from_cents(1234));
    assert_eq!(order.total_price, Money::from_cents(3702));
}

#[tokio::test]
#[serial]
async fn one_bad_line_aborts_everything() {
    let store = get_test_store().await;
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

    // No order, no lines, no stock movement.
    assert!(store.find_all().await.unwrap().is_empty());
    assert_eq!(store.find_product(widget).await.unwrap().stock, 10);
    assert_eq!(store.find_product(scarce).await.unwrap().stock, 1);
}

#[tokio::test]
#[serial]
async fn quantity_at_the_cap_fails_stock_validation() {
    let store = get_test_store().await;
    let widget = seed_product(&store, 1000, 5).await;

    let result = store
        .create(request(Some(1), &[(widget, domain::MAX_LINE_QUANTITY)]))
        .await;

    assert!(matches!(
        result,
        Err(OrderStoreError::Validation { ref insufficient_stock, .. })
            if insufficient_stock == &[widget]
    ));
    assert!(store.find_all().await.unwrap().is_empty());
    assert_eq!(store.find_product(widget).await.unwrap().stock, 5);
}

#[tokio::test]
#[serial]
async fn unavailable_product_rejects_the_request() {
    let store = get_test_store().await;
    let widget = seed_product(&store, 1000, 3).await;

    // Drain the product so availability flips off.
    store.create(request(None, &[(widget, 3)])).await.unwrap();
    let product = store.find_product(widget).await.unwrap();
    assert_eq!(product.stock, 0);
    assert!(!product.is_available);

    let result = store.create(request(None, &[(widget, 1)])).await;
    assert!(matches!(
        result,
        Err(OrderStoreError::Validation { ref unavailable, .. }) if unavailable == &[widget]
    ));
}

#[tokio::test]
#[serial]
async fn concurrent_requests_for_full_stock_yield_one_success() {
    let store = get_test_store().await;
    let widget = seed_product(&store, 1000, 5).await;

    let store_a = store.clone();
    let store_b = store.clone();
    let req_a = request(Some(1), &[(widget, 5)]);
    let req_b = request(Some(2), &[(widget, 5)]);

    let (a, b) = tokio::join!(
        tokio::spawn(async move { store_a.create(req_a).await }),
        tokio::spawn(async move { store_b.create(req_b).await }),
    );
    let results = [a.unwrap(), b.unwrap()];

    let successes = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1, "exactly one checkout may win the stock");

    let failure = results.iter().find(|r| r.is_err()).unwrap();
    assert!(matches!(
        failure,
        Err(OrderStoreError::Validation { .. }) | Err(OrderStoreError::TransactionConflict { .. })
    ));

    // Stock never goes negative.
    let product = store.find_product(widget).await.unwrap();
    assert_eq!(product.stock, 0);
    assert!(!product.is_available);
    assert_eq!(store.find_all().await.unwrap().len(), 1);
}

#[tokio::test]
#[serial]
async fn guest_orders_are_visible_everywhere() {
    let store = get_test_store().await;
    let widget = seed_product(&store, 1000, 10).await;

    let order = store.create(request(None, &[(widget, 1)])).await.unwrap();

    assert_eq!(order.user_id, None);
    assert_eq!(store.find_by_id(order.id).await.unwrap().user_id, None);
    assert_eq!(store.find_all().await.unwrap().len(), 1);
    assert!(store.find_by_user_id(UserId::new(1)).await.unwrap().is_empty());
}

#[tokio::test]
#[serial]
async fn find_by_user_id_filters_orders() {
    let store = get_test_store().await;
    let widget = seed_product(&store, 1000, 10).await;

    store.create(request(Some(1), &[(widget, 1)])).await.unwrap();
    store.create(request(Some(1), &[(widget, 2)])).await.unwrap();
    store.create(request(Some(2), &[(widget, 1)])).await.unwrap();

    let orders = store.find_by_user_id(UserId::new(1)).await.unwrap();
    assert_eq!(orders.len(), 2);
    assert!(orders.iter().all(|o| o.user_id == Some(UserId::new(1))));

    assert!(store.find_by_user_id(UserId::new(9)).await.unwrap().is_empty());
}

#[tokio::test]
#[serial]
async fn delete_cascades_to_lines() {
    let store = get_test_store().await;
    let widget = seed_product(&store, 1000, 10).await;
    let order = store.create(request(Some(1), &[(widget, 1)])).await.unwrap();

    store.delete(order.id).await.unwrap();

    assert!(matches!(
        store.find_by_id(order.id).await,
        Err(OrderStoreError::OrderNotFound(_))
    ));
    let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM order_items")
        .fetch_one(store.pool())
        .await
        .unwrap();
    assert_eq!(remaining, 0);
}

#[tokio::test]
#[serial]
async fn delete_missing_order_is_not_found() {
    let store = get_test_store().await;
    let result = store.delete(OrderId::new(999)).await;
    assert!(matches!(result, Err(OrderStoreError::OrderNotFound(_))));
}
