//! Saga error types.

use common::OrderId;
use domain::OrderError;
use record_store::StoreError;
use thiserror::Error;

/// Errors that can occur during saga operations.
#[derive(Debug, Error)]
pub enum SagaError {
    /// The catalog does not know the requested book.
    #[error("Book with isbn {isbn} not found")]
    BookNotFound { isbn: String },

    /// The catalog has fewer copies than requested.
    #[error("Book with isbn {isbn} has insufficient stock: requested {requested}, available {available}")]
    InsufficientStock {
        isbn: String,
        requested: u32,
        available: i32,
    },

    /// Order not found.
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// The order's status forbids the requested operation.
    #[error("Consistency error: {0}")]
    Consistency(String),

    /// The request was rejected before any collaborator was called.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The catalog service failed; not retried.
    #[error("Inventory service error: {0}")]
    InventoryService(String),

    /// The event bus refused a message.
    #[error("Event publisher error: {0}")]
    EventPublisher(String),

    /// Record store error.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<OrderError> for SagaError {
    fn from(e: OrderError) -> Self {
        match e {
            OrderError::InvalidQuantity { .. } | OrderError::NoItems => {
                SagaError::InvalidRequest(e.to_string())
            }
            OrderError::InvalidStateTransition { .. } | OrderError::InvalidTotal(_) => {
                SagaError::Consistency(e.to_string())
            }
        }
    }
}

/// Convenience type alias for saga results.
pub type Result<T> = std::result::Result<T, SagaError>;
