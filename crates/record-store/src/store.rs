//! Record store trait and the unit of work committed through it.

use std::collections::HashSet;

use async_trait::async_trait;
use domain::{LineItem, Order, OrderStatus};

use crate::{OrderId, Result, StoreError};

/// Writes staged by one saga step, committed together or not at all.
///
/// Staging the same order twice keeps only the latest copy, so a step can
/// stage the fresh order first and the priced order at the end.
#[derive(Debug, Clone, Default)]
pub struct UnitOfWork {
    orders: Vec<Order>,
    line_items: Vec<LineItem>,
}

impl UnitOfWork {
    /// Creates an empty unit of work.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stages an order, replacing an earlier staged copy with the same id.
    pub fn stage_order(&mut self, order: &Order) {
        match self.orders.iter_mut().find(|o| o.id() == order.id()) {
            Some(existing) => *existing = order.clone(),
            None => self.orders.push(order.clone()),
        }
    }

    /// Stages a line item.
    pub fn stage_line_item(&mut self, item: LineItem) {
        self.line_items.push(item);
    }

    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    /// Line items in staging order.
    pub fn line_items(&self) -> &[LineItem] {
        &self.line_items
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty() && self.line_items.is_empty()
    }

    /// Consumes the unit, returning staged orders and line items.
    pub fn into_parts(self) -> (Vec<Order>, Vec<LineItem>) {
        (self.orders, self.line_items)
    }
}

/// Core trait for order persistence.
///
/// All implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Inserts or updates an order.
    async fn save_order(&self, order: &Order) -> Result<()>;

    /// Writes `order` only if the stored copy is still in `expected` status.
    ///
    /// Returns false, leaving the store untouched, when the order is missing
    /// or another writer moved it out of `expected` first.
    async fn transition_order(&self, order: &Order, expected: OrderStatus) -> Result<bool>;

    /// Loads an order by id.
    ///
    /// Returns None if the order doesn't exist.
    async fn find_order(&self, order_id: OrderId) -> Result<Option<Order>>;

    /// Inserts a line item. Line items are immutable; saving an existing
    /// id again leaves the stored row untouched.
    async fn save_line_item(&self, item: &LineItem) -> Result<()>;

    /// Retrieves all line items of an order in the order they were saved.
    async fn find_line_items(&self, order_id: OrderId) -> Result<Vec<LineItem>>;

    /// Persists every staged order and line item atomically.
    ///
    /// Either all writes succeed or none are visible.
    async fn commit(&self, unit: UnitOfWork) -> Result<()>;
}

/// Validates a unit of work before committing.
///
/// Every staged line item must belong to an order staged in the same unit,
/// otherwise an orphan row could be written.
pub fn validate_unit_of_work(unit: &UnitOfWork) -> Result<()> {
    if unit.is_empty() {
        return Err(StoreError::InvalidUnitOfWork(
            "Cannot commit an empty unit of work".to_string(),
        ));
    }

    let staged: HashSet<OrderId> = unit.orders().iter().map(Order::id).collect();
    if let Some(orphan) = unit
        .line_items()
        .iter()
        .find(|item| !staged.contains(&item.order_id()))
    {
        return Err(StoreError::InvalidUnitOfWork(format!(
            "Line item {} references order {} which is not part of the unit",
            orphan.id(),
            orphan.order_id()
        )));
    }

    Ok(())
}
