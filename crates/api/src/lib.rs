//! HTTP API server for the storefront cart and order system.
//!
//! Exposes cart management, product provisioning, direct order creation,
//! and cart checkout over REST, with structured logging (tracing) and
//! Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{delete, get, patch, post};
use cart_store::CartStore;
use checkout::{CartService, CheckoutCoordinator};
use metrics_exporter_prometheus::PrometheusHandle;
use order_store::{InventoryLedger, OrderStore};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared application state accessible from all handlers.
pub struct AppState<C: CartStore, S> {
    pub cart_service: CartService<C, S>,
    pub checkout: CheckoutCoordinator<C, S>,
    pub store: S,
}

impl<C, S> AppState<C, S>
where
    C: CartStore + Clone,
    S: OrderStore + InventoryLedger + Clone,
{
    /// Wires the services over a cart store and a combined order store /
    /// inventory ledger.
    pub fn new(carts: C, store: S) -> Self {
        Self {
            cart_service: CartService::new(carts.clone(), store.clone()),
            checkout: CheckoutCoordinator::new(carts, store.clone()),
            store,
        }
    }
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<C, S>(state: Arc<AppState<C, S>>, metrics_handle: PrometheusHandle) -> Router
where
    C: CartStore + 'static,
    S: OrderStore + InventoryLedger + 'static,
{
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::render))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/carts", post(routes::carts::create::<C, S>))
        .route("/carts/{id}", get(routes::carts::get::<C, S>))
        .route("/carts/{id}", delete(routes::carts::delete::<C, S>))
        .route("/carts/user/{user_id}", get(routes::carts::get_by_user::<C, S>))
        .route("/carts/{id}/items", post(routes::carts::add_item::<C, S>))
        .route("/carts/{id}/items", delete(routes::carts::clear::<C, S>))
        .route(
            "/carts/{id}/items/{product_id}",
            patch(routes::carts::update_item::<C, S>),
        )
        .route(
            "/carts/{id}/items/{product_id}",
            delete(routes::carts::remove_item::<C, S>),
        )
        .route("/orders", post(routes::orders::create::<C, S>))
        .route("/orders", get(routes::orders::list::<C, S>))
        .route("/orders/{id}", get(routes::orders::get::<C, S>))
        .route("/orders/{id}", delete(routes::orders::delete::<C, S>))
        .route(
            "/orders/user/{user_id}",
            get(routes::orders::list_by_user::<C, S>),
        )
        .route(
            "/orders/cart/{cart_id}",
            post(routes::orders::checkout::<C, S>),
        )
        .route("/products", post(routes::products::create::<C, S>))
        .route("/products", get(routes::products::list::<C, S>))
        .route("/products/{id}", get(routes::products::get::<C, S>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
