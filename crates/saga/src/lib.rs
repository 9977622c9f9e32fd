//! Order fulfillment saga for the bookstore.
//!
//! The saga drives an order through its lifecycle without a global transaction:
//! 1. Submit: price every requested book against the catalog and record the
//!    order with its line items atomically
//! 2. Accept: mark the order accepted, reduce catalog inventory and announce
//!    the acceptance on the event bus
//! 3. Dispatch: react to the dispatcher's notification
//!
//! If inventory reduction fails part way through acceptance, the reductions
//! already applied are restored and the order is rejected.

pub mod consumer;
pub mod coordinator;
pub mod error;
pub mod line_item;
pub mod messages;
pub mod order_fulfillment;
pub mod services;

pub use consumer::{ConsumerSummary, DispatchConsumer};
pub use coordinator::OrderSaga;
pub use error::SagaError;
pub use line_item::LineItemProcessor;
pub use messages::{OrderAcceptedMessage, OrderDispatchedMessage};
pub use services::{
    EventPublisher, HttpInventoryClient, InMemoryEventBus, InMemoryInventoryClient,
    InventoryClient, MessageStream,
};
