//! Order record, line items and related types.

mod line_item;
mod model;
mod state;
mod value_objects;

pub use line_item::LineItem;
pub use model::Order;
pub use state::{OrderStatus, UnknownStatus};
pub use value_objects::{BookSnapshot, LineItemRequest, UserInformation};

use thiserror::Error;

/// Errors that can occur during order operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OrderError {
    /// Order is not in a state that allows the requested transition.
    #[error("Invalid state transition: cannot {action} from {current_state} state")]
    InvalidStateTransition {
        current_state: OrderStatus,
        action: &'static str,
    },

    /// Requested quantity for a line item is zero.
    #[error("Invalid quantity for {isbn}: {quantity} (must be greater than 0)")]
    InvalidQuantity { isbn: String, quantity: u32 },

    /// Submission carried no items.
    #[error("Order has no items")]
    NoItems,

    /// Computed total is negative or not a number.
    #[error("Invalid total price: {0}")]
    InvalidTotal(f64),
}
