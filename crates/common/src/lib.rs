//! Identifier types shared by every crate of the order service.

mod types;

pub use types::{LineItemId, OrderId};
