//! Order fulfillment and the inventory ledger.
//!
//! [`OrderStore::create`] is the one place stock changes hands: it joins a
//! request against live product state, prices it from that same snapshot,
//! and commits order, lines, and stock decrements as one serializable unit
//! of work. [`RetryPolicy`] bounds the retries when concurrent checkouts
//! make the transaction abort.

pub mod error;
pub mod ledger;
pub mod memory;
pub mod postgres;
pub mod retry;
pub mod store;

pub use error::{OrderStoreError, Result};
pub use ledger::InventoryLedger;
pub use memory::InMemoryOrderStore;
pub use postgres::PostgresOrderStore;
pub use retry::RetryPolicy;
pub use store::OrderStore;
