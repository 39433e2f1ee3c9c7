//! Core domain types for the storefront.
//!
//! This crate holds the entities shared by the cart store, the order
//! fulfillment engine, and the HTTP layer:
//! - [`Cart`] and [`CartLine`]: the mutable, pre-purchase item list
//! - [`Order`] and [`OrderLine`]: the immutable purchase record
//! - [`Product`]: the inventory ledger's view of a product
//! - [`CreateOrderRequest`]: a validated fulfillment request
//! - [`Money`]: integer-cents money

pub mod cart;
pub mod error;
pub mod money;
pub mod order;
pub mod product;

/// Largest quantity a single line may carry.
///
/// Stock levels are `i32`; bounding quantities to the same range keeps
/// stock comparisons and database bindings exact.
pub const MAX_LINE_QUANTITY: u32 = i32::MAX as u32;

pub use cart::{Cart, CartLine};
pub use error::DomainError;
pub use money::Money;
pub use order::{CreateOrderRequest, LineRequest, Order, OrderLine};
pub use product::{NewProduct, Product};
