//! External collaborator traits and their implementations.

pub mod catalog;
pub mod inventory;
pub mod publisher;

pub use catalog::HttpInventoryClient;
pub use inventory::{InMemoryInventoryClient, InventoryClient};
pub use publisher::{EventPublisher, InMemoryEventBus, MessageStream};
