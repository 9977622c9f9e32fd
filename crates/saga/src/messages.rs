//! Messages exchanged with the dispatcher over the event bus.

use common::OrderId;
use domain::{LineItem, UserInformation};
use serde::{Deserialize, Serialize};

/// Published on `order-accepted` once an order's inventory has been reduced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderAcceptedMessage {
    pub order_id: OrderId,
    pub line_items: Vec<LineItem>,
    pub user_information: UserInformation,
}

/// Received on `order-dispatched` when the dispatcher has shipped an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDispatchedMessage {
    pub order_id: OrderId,
}

impl OrderDispatchedMessage {
    pub fn new(order_id: OrderId) -> Self {
        Self { order_id }
    }
}
