use async_trait::async_trait;
use common::ProductId;
use domain::{NewProduct, Product};

use crate::Result;

/// The authoritative product store.
///
/// Price, stock, and availability read from here are ground truth. Nothing
/// outside the fulfillment engine's own transaction may mutate stock, so
/// this trait deliberately has no stock-update operation.
#[async_trait]
pub trait InventoryLedger: Send + Sync {
    /// Provisions a product and returns it with its assigned id.
    async fn insert_product(&self, product: NewProduct) -> Result<Product>;

    /// Loads a product by id.
    async fn find_product(&self, product_id: ProductId) -> Result<Product>;

    /// Lists all products.
    async fn list_products(&self) -> Result<Vec<Product>>;
}
