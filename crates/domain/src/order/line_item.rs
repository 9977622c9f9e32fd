//! Line items recorded against an order.

use common::{LineItemId, OrderId};
use serde::{Deserialize, Serialize};

use super::BookSnapshot;

/// One priced, quantity-bearing entry of an order.
///
/// Immutable once created: the catalog snapshot fixes the unit price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    id: LineItemId,
    order_id: OrderId,
    isbn: String,
    quantity: u32,
    book: BookSnapshot,
}

impl LineItem {
    /// Creates a line item for `order_id` from a validated catalog lookup.
    pub fn new(order_id: OrderId, isbn: impl Into<String>, quantity: u32, book: BookSnapshot) -> Self {
        Self {
            id: LineItemId::new(),
            order_id,
            isbn: isbn.into(),
            quantity,
            book,
        }
    }

    /// Rebuilds a line item from persisted columns.
    pub fn from_parts(
        id: LineItemId,
        order_id: OrderId,
        isbn: String,
        quantity: u32,
        book: BookSnapshot,
    ) -> Self {
        Self {
            id,
            order_id,
            isbn,
            quantity,
            book,
        }
    }

    pub fn id(&self) -> LineItemId {
        self.id
    }

    pub fn order_id(&self) -> OrderId {
        self.order_id
    }

    /// Catalog identifier the buyer asked for.
    pub fn isbn(&self) -> &str {
        &self.isbn
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn book(&self) -> &BookSnapshot {
        &self.book
    }

    /// Snapshotted unit price multiplied by quantity.
    pub fn line_price(&self) -> f64 {
        self.book.price as f64 * f64::from(self.quantity)
    }
}
