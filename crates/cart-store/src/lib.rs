//! Expiring cart storage.
//!
//! Carts live as one serialized record per cart id with a sliding
//! time-to-live that every mutation re-arms. Two backends implement the
//! [`CartStore`] trait:
//! - [`PostgresCartStore`]: a JSONB row per cart, mutations under a row lock
//! - [`InMemoryCartStore`]: a locked map, used by tests and benches

pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;

pub use error::{CartStoreError, Result};
pub use memory::InMemoryCartStore;
pub use postgres::PostgresCartStore;
pub use store::CartStore;
