//! Order fulfillment channel names.

/// Outbound channel carrying [`crate::OrderAcceptedMessage`].
pub const ORDER_ACCEPTED_CHANNEL: &str = "order-accepted";

/// Inbound channel carrying [`crate::OrderDispatchedMessage`].
pub const ORDER_DISPATCHED_CHANNEL: &str = "order-dispatched";
