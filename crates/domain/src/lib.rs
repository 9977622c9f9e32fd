//! Domain layer for the bookstore order service.
//!
//! This crate provides the records the order saga works on:
//! - `Order` with its `OrderStatus` state machine
//! - `LineItem`, one priced entry of an order with a catalog snapshot
//! - value objects exchanged with the catalog service and the event bus

pub mod order;

pub use order::{
    BookSnapshot, LineItem, LineItemRequest, Order, OrderError, OrderStatus, UnknownStatus,
    UserInformation,
};
