//! Cart use cases and checkout orchestration.
//!
//! [`CartService`] enriches cart edits with ledger lookups (price and name
//! snapshots, advisory stock checks); [`CheckoutCoordinator`] turns a cart
//! into a committed order and retires the cart on success.

pub mod coordinator;
pub mod error;
pub mod service;

pub use coordinator::CheckoutCoordinator;
pub use error::{CheckoutError, Result};
pub use service::CartService;
