//! Cart management endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use cart_store::CartStore;
use common::{CartId, ProductId, UserId};
use domain::{Cart, LineRequest};
use order_store::{InventoryLedger, OrderStore};
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::error::ApiError;

// -- Request types --

#[derive(Deserialize)]
pub struct CreateCartRequest {
    pub user_id: i64,
    #[serde(default)]
    pub items: Vec<ItemRequest>,
}

#[derive(Deserialize)]
pub struct ItemRequest {
    pub product_id: i64,
    pub quantity: u32,
}

#[derive(Deserialize)]
pub struct AddItemRequest {
    pub product_id: i64,
    pub quantity: u32,
}

#[derive(Deserialize)]
pub struct UpdateQuantityRequest {
    pub quantity: u32,
}

// -- Response types --

#[derive(Serialize)]
pub struct CartResponse {
    pub id: String,
    pub user_id: i64,
    pub items: Vec<CartLineResponse>,
    pub created_at: String,
    pub updated_at: String,
    pub expires_at: String,
}

#[derive(Serialize)]
pub struct CartLineResponse {
    pub product_id: i64,
    pub quantity: u32,
    pub unit_price_cents: i64,
    pub name: String,
}

impl From<&Cart> for CartResponse {
    fn from(cart: &Cart) -> Self {
        Self {
            id: cart.id().to_string(),
            user_id: cart.user_id().as_i64(),
            items: cart
                .lines()
                .map(|line| CartLineResponse {
                    product_id: line.product_id.as_i64(),
                    quantity: line.quantity,
                    unit_price_cents: line.unit_price.cents(),
                    name: line.name.clone(),
                })
                .collect(),
            created_at: cart.created_at().to_rfc3339(),
            updated_at: cart.updated_at().to_rfc3339(),
            expires_at: cart.expires_at().to_rfc3339(),
        }
    }
}

// -- Handlers --

/// POST /carts — create a cart, optionally seeded with initial items.
#[tracing::instrument(skip(state, req))]
pub async fn create<C, S>(
    State(state): State<Arc<AppState<C, S>>>,
    Json(req): Json<CreateCartRequest>,
) -> Result<(StatusCode, Json<CartResponse>), ApiError>
where
    C: CartStore + 'static,
    S: OrderStore + InventoryLedger + 'static,
{
    let lines = req
        .items
        .iter()
        .map(|item| LineRequest::new(ProductId::new(item.product_id), item.quantity))
        .collect();

    let cart = state
        .cart_service
        .create_cart(UserId::new(req.user_id), lines)
        .await?;

    Ok((StatusCode::CREATED, Json(CartResponse::from(&cart))))
}

/// GET /carts/:id — load a cart by id.
#[tracing::instrument(skip(state))]
pub async fn get<C, S>(
    State(state): State<Arc<AppState<C, S>>>,
    Path(id): Path<String>,
) -> Result<Json<CartResponse>, ApiError>
where
    C: CartStore + 'static,
    S: OrderStore + InventoryLedger + 'static,
{
    let cart_id = parse_cart_id(&id)?;
    let cart = state.cart_service.find_by_id(cart_id).await?;
    Ok(Json(CartResponse::from(&cart)))
}

/// GET /carts/user/:user_id — load a user's live cart.
#[tracing::instrument(skip(state))]
pub async fn get_by_user<C, S>(
    State(state): State<Arc<AppState<C, S>>>,
    Path(user_id): Path<i64>,
) -> Result<Json<CartResponse>, ApiError>
where
    C: CartStore + 'static,
    S: OrderStore + InventoryLedger + 'static,
{
    let cart = state
        .cart_service
        .find_by_user_id(UserId::new(user_id))
        .await?;
    Ok(Json(CartResponse::from(&cart)))
}

/// POST /carts/:id/items — add an item; price and name come from the ledger.
#[tracing::instrument(skip(state, req))]
pub async fn add_item<C, S>(
    State(state): State<Arc<AppState<C, S>>>,
    Path(id): Path<String>,
    Json(req): Json<AddItemRequest>,
) -> Result<Json<CartResponse>, ApiError>
where
    C: CartStore + 'static,
    S: OrderStore + InventoryLedger + 'static,
{
    let cart_id = parse_cart_id(&id)?;
    let cart = state
        .cart_service
        .add_item(cart_id, ProductId::new(req.product_id), req.quantity)
        .await?;
    Ok(Json(CartResponse::from(&cart)))
}

/// PATCH /carts/:id/items/:product_id — set a line's quantity (0 removes).
#[tracing::instrument(skip(state, req))]
pub async fn update_item<C, S>(
    State(state): State<Arc<AppState<C, S>>>,
    Path((id, product_id)): Path<(String, i64)>,
    Json(req): Json<UpdateQuantityRequest>,
) -> Result<Json<CartResponse>, ApiError>
where
    C: CartStore + 'static,
    S: OrderStore + InventoryLedger + 'static,
{
    let cart_id = parse_cart_id(&id)?;
    let cart = state
        .cart_service
        .update_item_quantity(cart_id, ProductId::new(product_id), req.quantity)
        .await?;
    Ok(Json(CartResponse::from(&cart)))
}

/// DELETE /carts/:id/items/:product_id — remove a line.
#[tracing::instrument(skip(state))]
pub async fn remove_item<C, S>(
    State(state): State<Arc<AppState<C, S>>>,
    Path((id, product_id)): Path<(String, i64)>,
) -> Result<Json<CartResponse>, ApiError>
where
    C: CartStore + 'static,
    S: OrderStore + InventoryLedger + 'static,
{
    let cart_id = parse_cart_id(&id)?;
    let cart = state
        .cart_service
        .remove_item(cart_id, ProductId::new(product_id))
        .await?;
    Ok(Json(CartResponse::from(&cart)))
}

/// DELETE /carts/:id/items — empty the cart; the record survives.
#[tracing::instrument(skip(state))]
pub async fn clear<C, S>(
    State(state): State<Arc<AppState<C, S>>>,
    Path(id): Path<String>,
) -> Result<Json<CartResponse>, ApiError>
where
    C: CartStore + 'static,
    S: OrderStore + InventoryLedger + 'static,
{
    let cart_id = parse_cart_id(&id)?;
    state.cart_service.clear(cart_id).await?;
    let cart = state.cart_service.find_by_id(cart_id).await?;
    Ok(Json(CartResponse::from(&cart)))
}

/// DELETE /carts/:id — delete the cart record.
#[tracing::instrument(skip(state))]
pub async fn delete<C, S>(
    State(state): State<Arc<AppState<C, S>>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError>
where
    C: CartStore + 'static,
    S: OrderStore + InventoryLedger + 'static,
{
    let cart_id = parse_cart_id(&id)?;
    state.cart_service.delete(cart_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

fn parse_cart_id(id: &str) -> Result<CartId, ApiError> {
    let uuid = uuid::Uuid::parse_str(id)
        .map_err(|e| ApiError::BadRequest(format!("Invalid cart id: {e}")))?;
    Ok(CartId::from(uuid))
}
