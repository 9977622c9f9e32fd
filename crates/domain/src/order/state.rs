//! Order status state machine.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The status of an order in its lifecycle.
///
/// State transitions:
/// ```text
/// WAITING_FOR_PAYMENT ──► ACCEPTED ──► DISPATCHED
///          │   │              │
///          │   └──────────────┼──────► DISPATCHED (dispatch overtook accept)
///          └──────────────────┴──────► REJECTED
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Order and line items are recorded, payment has not been confirmed.
    #[default]
    WaitingForPayment,

    /// Payment confirmed, inventory reduced, waiting for the dispatcher.
    Accepted,

    /// Acceptance failed or the order was cancelled (terminal state).
    Rejected,

    /// Order has left the warehouse (terminal state).
    Dispatched,
}

impl OrderStatus {
    /// Returns true if the order can be accepted in this state.
    pub fn can_accept(&self) -> bool {
        matches!(self, OrderStatus::WaitingForPayment)
    }

    /// Returns true if the order can be rejected in this state.
    pub fn can_reject(&self) -> bool {
        matches!(self, OrderStatus::WaitingForPayment | OrderStatus::Accepted)
    }

    /// Returns true if a dispatch notification may move the order to `Dispatched`.
    pub fn can_dispatch(&self) -> bool {
        matches!(self, OrderStatus::WaitingForPayment | OrderStatus::Accepted)
    }

    /// Returns true if a payment redirect may be built for the order.
    pub fn awaits_payment(&self) -> bool {
        matches!(self, OrderStatus::WaitingForPayment)
    }

    /// Returns true if this is a terminal state (no further transitions possible).
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Rejected | OrderStatus::Dispatched)
    }

    /// Returns the status name as stored and transmitted.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::WaitingForPayment => "WAITING_FOR_PAYMENT",
            OrderStatus::Accepted => "ACCEPTED",
            OrderStatus::Rejected => "REJECTED",
            OrderStatus::Dispatched => "DISPATCHED",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error returned when parsing an unknown status name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStatus(pub String);

impl std::fmt::Display for UnknownStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown order status: {}", self.0)
    }
}

impl std::error::Error for UnknownStatus {}

impl FromStr for OrderStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "WAITING_FOR_PAYMENT" => Ok(OrderStatus::WaitingForPayment),
            "ACCEPTED" => Ok(OrderStatus::Accepted),
            "REJECTED" => Ok(OrderStatus::Rejected),
            "DISPATCHED" => Ok(OrderStatus::Dispatched),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}
