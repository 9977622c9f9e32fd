//! Payment error types.

use common::OrderId;
use record_store::StoreError;
use thiserror::Error;

/// Errors that can occur while building or verifying gateway requests.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// Order not found.
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// The order is not waiting for payment.
    #[error("Consistency error: {0}")]
    Consistency(String),

    /// The returned parameters do not carry a valid signature.
    #[error("Invalid payment signature")]
    InvalidSignature,

    /// A parameter required by the gateway protocol is absent or empty.
    #[error("Missing payment parameter: {0}")]
    MissingParameter(&'static str),

    /// A parameter is present but cannot be interpreted.
    #[error("Invalid payment parameter {name}: {value}")]
    InvalidParameter { name: &'static str, value: String },

    /// The shared secret cannot be used as an HMAC key.
    #[error("Invalid signing key")]
    InvalidKey,

    /// Record store error.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Convenience type alias for payment results.
pub type Result<T> = std::result::Result<T, PaymentError>;
