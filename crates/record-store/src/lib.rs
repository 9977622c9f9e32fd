//! Order and line item persistence.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;

pub use common::{LineItemId, OrderId};
pub use error::{Result, StoreError};
pub use memory::InMemoryRecordStore;
pub use postgres::PostgresRecordStore;
pub use store::{RecordStore, UnitOfWork};
