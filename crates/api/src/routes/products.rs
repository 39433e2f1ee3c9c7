//! Product provisioning and lookup endpoints.
//!
//! Provisioning and reads only: stock mutation belongs to the fulfillment
//! engine, so there is no product update or delete route.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use cart_store::CartStore;
use common::ProductId;
use domain::{Money, NewProduct, Product};
use order_store::{InventoryLedger, OrderStore};
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::error::ApiError;

#[derive(Deserialize)]
pub struct CreateProductRequest {
    pub name: String,
    pub description: Option<String>,
    pub price_cents: i64,
    pub stock: i32,
}

#[derive(Serialize)]
pub struct ProductResponse {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub price_cents: i64,
    pub stock: i32,
    pub is_available: bool,
}

impl From<&Product> for ProductResponse {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id.as_i64(),
            name: product.name.clone(),
            description: product.description.clone(),
            price_cents: product.price.cents(),
            stock: product.stock,
            is_available: product.is_available,
        }
    }
}

/// POST /products — provision a product into the ledger.
#[tracing::instrument(skip(state, req), fields(name = %req.name))]
pub async fn create<C, S>(
    State(state): State<Arc<AppState<C, S>>>,
    Json(req): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<ProductResponse>), ApiError>
where
    C: CartStore + 'static,
    S: OrderStore + InventoryLedger + 'static,
{
    let new_product = NewProduct::new(
        req.name,
        req.description,
        Money::from_cents(req.price_cents),
        req.stock,
    )
    .map_err(ApiError::from)?;

    let product = state.store.insert_product(new_product).await?;
    Ok((StatusCode::CREATED, Json(ProductResponse::from(&product))))
}

/// GET /products/:id — load one product.
#[tracing::instrument(skip(state))]
pub async fn get<C, S>(
    State(state): State<Arc<AppState<C, S>>>,
    Path(id): Path<i64>,
) -> Result<Json<ProductResponse>, ApiError>
where
    C: CartStore + 'static,
    S: OrderStore + InventoryLedger + 'static,
{
    let product = state.store.find_product(ProductId::new(id)).await?;
    Ok(Json(ProductResponse::from(&product)))
}

/// GET /products — list the ledger.
#[tracing::instrument(skip(state))]
pub async fn list<C, S>(
    State(state): State<Arc<AppState<C, S>>>,
) -> Result<Json<Vec<ProductResponse>>, ApiError>
where
    C: CartStore + 'static,
    S: OrderStore + InventoryLedger + 'static,
{
    let products = state.store.list_products().await?;
    Ok(Json(products.iter().map(ProductResponse::from).collect()))
}
