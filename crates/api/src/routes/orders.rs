//! Order lookup, direct creation, and cart checkout endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use cart_store::CartStore;
use common::{CartId, OrderId, ProductId, UserId};
use domain::{CreateOrderRequest, LineRequest, Order};
use order_store::{InventoryLedger, OrderStore};
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::error::ApiError;

// -- Request types --

#[derive(Deserialize)]
pub struct CreateOrderHttpRequest {
    /// Absent user id means a guest order.
    pub user_id: Option<i64>,
    pub lines: Vec<OrderLineRequest>,
}

#[derive(Deserialize)]
pub struct OrderLineRequest {
    pub product_id: i64,
    pub quantity: u32,
}

// -- Response types --

#[derive(Serialize)]
pub struct OrderResponse {
    pub id: i64,
    pub user_id: Option<i64>,
    pub total_price_cents: i64,
    pub created_at: String,
    pub updated_at: String,
    pub lines: Vec<OrderLineResponse>,
}

#[derive(Serialize)]
pub struct OrderLineResponse {
    pub id: i64,
    pub product_id: i64,
    pub quantity: u32,
    pub unit_price_cents: i64,
}

impl From<&Order> for OrderResponse {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id.as_i64(),
            user_id: order.user_id.map(|user| user.as_i64()),
            total_price_cents: order.total_price.cents(),
            created_at: order.created_at.to_rfc3339(),
            updated_at: order.updated_at.to_rfc3339(),
            lines: order
                .lines
                .iter()
                .map(|line| OrderLineResponse {
                    id: line.id,
                    product_id: line.product_id.as_i64(),
                    quantity: line.quantity,
                    unit_price_cents: line.unit_price.cents(),
                })
                .collect(),
        }
    }
}

// -- Handlers --

/// POST /orders — create an order directly from product/quantity lines.
#[tracing::instrument(skip(state, req))]
pub async fn create<C, S>(
    State(state): State<Arc<AppState<C, S>>>,
    Json(req): Json<CreateOrderHttpRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError>
where
    C: CartStore + 'static,
    S: OrderStore + InventoryLedger + 'static,
{
    let request = CreateOrderRequest::new(
        req.user_id.map(UserId::new),
        req.lines
            .iter()
            .map(|line| LineRequest::new(ProductId::new(line.product_id), line.quantity)),
    )
    .map_err(ApiError::from)?;

    let order = state.store.create(request).await?;
    Ok((StatusCode::CREATED, Json(OrderResponse::from(&order))))
}

/// POST /orders/cart/:cart_id — check out a cart into an order.
#[tracing::instrument(skip(state))]
pub async fn checkout<C, S>(
    State(state): State<Arc<AppState<C, S>>>,
    Path(cart_id): Path<String>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError>
where
    C: CartStore + 'static,
    S: OrderStore + InventoryLedger + 'static,
{
    let cart_id = parse_cart_id(&cart_id)?;
    let order = state.checkout.execute(cart_id).await?;
    Ok((StatusCode::CREATED, Json(OrderResponse::from(&order))))
}

/// GET /orders — list every order with its lines.
#[tracing::instrument(skip(state))]
pub async fn list<C, S>(
    State(state): State<Arc<AppState<C, S>>>,
) -> Result<Json<Vec<OrderResponse>>, ApiError>
where
    C: CartStore + 'static,
    S: OrderStore + InventoryLedger + 'static,
{
    let orders = state.store.find_all().await?;
    Ok(Json(orders.iter().map(OrderResponse::from).collect()))
}

/// GET /orders/:id — load one order.
#[tracing::instrument(skip(state))]
pub async fn get<C, S>(
    State(state): State<Arc<AppState<C, S>>>,
    Path(id): Path<i64>,
) -> Result<Json<OrderResponse>, ApiError>
where
    C: CartStore + 'static,
    S: OrderStore + InventoryLedger + 'static,
{
    let order = state.store.find_by_id(OrderId::new(id)).await?;
    Ok(Json(OrderResponse::from(&order)))
}

/// GET /orders/user/:user_id — a user's orders; an empty list is fine.
#[tracing::instrument(skip(state))]
pub async fn list_by_user<C, S>(
    State(state): State<Arc<AppState<C, S>>>,
    Path(user_id): Path<i64>,
) -> Result<Json<Vec<OrderResponse>>, ApiError>
where
    C: CartStore + 'static,
    S: OrderStore + InventoryLedger + 'static,
{
    let orders = state.store.find_by_user_id(UserId::new(user_id)).await?;
    Ok(Json(orders.iter().map(OrderResponse::from).collect()))
}

/// DELETE /orders/:id — delete an order and its lines.
#[tracing::instrument(skip(state))]
pub async fn delete<C, S>(
    State(state): State<Arc<AppState<C, S>>>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError>
where
    C: CartStore + 'static,
    S: OrderStore + InventoryLedger + 'static,
{
    state.store.delete(OrderId::new(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

fn parse_cart_id(id: &str) -> Result<CartId, ApiError> {
    let uuid = uuid::Uuid::parse_str(id)
        .map_err(|e| ApiError::BadRequest(format!("Invalid cart id: {e}")))?;
    Ok(CartId::from(uuid))
}
