pub mod types;

pub use types::{CartId, OrderId, ProductId, UserId};
