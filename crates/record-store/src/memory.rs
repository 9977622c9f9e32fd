//! In-memory record store.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use domain::{LineItem, Order, OrderStatus};
use tokio::sync::RwLock;

use crate::{
    OrderId, Result,
    store::{RecordStore, UnitOfWork, validate_unit_of_work},
};

#[derive(Default)]
struct Records {
    orders: HashMap<OrderId, Order>,
    line_items: Vec<LineItem>,
}

/// In-memory record store implementation for testing and local runs.
///
/// Provides the same interface as the PostgreSQL implementation. A commit
/// holds the write lock for its whole duration, so readers never observe a
/// partially applied unit of work.
#[derive(Clone, Default)]
pub struct InMemoryRecordStore {
    records: Arc<RwLock<Records>>,
}

impl InMemoryRecordStore {
    /// Creates a new empty in-memory record store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of orders stored.
    pub async fn order_count(&self) -> usize {
        self.records.read().await.orders.len()
    }

    /// Returns the number of line items stored across all orders.
    pub async fn line_item_count(&self) -> usize {
        self.records.read().await.line_items.len()
    }

    /// Clears all records.
    pub async fn clear(&self) {
        let mut records = self.records.write().await;
        records.orders.clear();
        records.line_items.clear();
    }
}

impl Records {
    fn insert_line_item(&mut self, item: LineItem) {
        if !self.line_items.iter().any(|existing| existing.id() == item.id()) {
            self.line_items.push(item);
        }
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn save_order(&self, order: &Order) -> Result<()> {
        self.records
            .write()
            .await
            .orders
            .insert(order.id(), order.clone());
        Ok(())
    }

    async fn transition_order(&self, order: &Order, expected: OrderStatus) -> Result<bool> {
        let mut records = self.records.write().await;
        match records.orders.get_mut(&order.id()) {
            Some(stored) if stored.status() == expected => {
                *stored = order.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn find_order(&self, order_id: OrderId) -> Result<Option<Order>> {
        Ok(self.records.read().await.orders.get(&order_id).cloned())
    }

    async fn save_line_item(&self, item: &LineItem) -> Result<()> {
        self.records.write().await.insert_line_item(item.clone());
        Ok(())
    }

    async fn find_line_items(&self, order_id: OrderId) -> Result<Vec<LineItem>> {
        let records = self.records.read().await;
        Ok(records
            .line_items
            .iter()
            .filter(|item| item.order_id() == order_id)
            .cloned()
            .collect())
    }

    async fn commit(&self, unit: UnitOfWork) -> Result<()> {
        validate_unit_of_work(&unit)?;

        let (orders, line_items) = unit.into_parts();
        let mut records = self.records.write().await;
        for order in orders {
            records.orders.insert(order.id(), order);
        }
        for item in line_items {
            records.insert_line_item(item);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use domain::{BookSnapshot, UserInformation};

    use super::*;

    fn book(isbn: &str, price: i64) -> BookSnapshot {
        BookSnapshot {
            isbn: isbn.to_string(),
            price,
            inventory: 10,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_save_and_find_order() {
        let store = InMemoryRecordStore::new();
        let order = Order::new(UserInformation::default());

        store.save_order(&order).await.unwrap();

        let found = store.find_order(order.id()).await.unwrap().unwrap();
        assert_eq!(found, order);
        assert!(store.find_order(OrderId::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_order_overwrites() {
        let store = InMemoryRecordStore::new();
        let mut order = Order::new(UserInformation::default());
        store.save_order(&order).await.unwrap();

        order.accept().unwrap();
        store.save_order(&order).await.unwrap();

        let found = store.find_order(order.id()).await.unwrap().unwrap();
        assert_eq!(found.status(), OrderStatus::Accepted);
        assert_eq!(store.order_count().await, 1);
    }

    #[tokio::test]
    async fn test_transition_order_checks_stored_status() {
        let store = InMemoryRecordStore::new();
        let order = Order::new(UserInformation::default());
        store.save_order(&order).await.unwrap();

        let mut accepted = order.clone();
        accepted.accept().unwrap();
        let mut rejected = order.clone();
        rejected.reject().unwrap();

        assert!(
            store
                .transition_order(&accepted, OrderStatus::WaitingForPayment)
                .await
                .unwrap()
        );
        // The stale copy loses: the stored order already left WAITING_FOR_PAYMENT.
        assert!(
            !store
                .transition_order(&rejected, OrderStatus::WaitingForPayment)
                .await
                .unwrap()
        );

        let found = store.find_order(order.id()).await.unwrap().unwrap();
        assert_eq!(found.status(), OrderStatus::Accepted);
    }

    #[tokio::test]
    async fn test_transition_unknown_order() {
        let store = InMemoryRecordStore::new();
        let mut order = Order::new(UserInformation::default());
        order.accept().unwrap();

        assert!(
            !store
                .transition_order(&order, OrderStatus::WaitingForPayment)
                .await
                .unwrap()
        );
        assert_eq!(store.order_count().await, 0);
    }

    #[tokio::test]
    async fn test_find_line_items_filters_by_order() {
        let store = InMemoryRecordStore::new();
        let first = OrderId::new();
        let second = OrderId::new();

        let a = LineItem::new(first, "A", 2, book("A", 10));
        let b = LineItem::new(second, "B", 1, book("B", 5));
        let c = LineItem::new(first, "C", 3, book("C", 7));
        for item in [&a, &b, &c] {
            store.save_line_item(item).await.unwrap();
        }
        // Saving an existing line item again is a no-op.
        store.save_line_item(&a).await.unwrap();

        let items = store.find_line_items(first).await.unwrap();
        assert_eq!(items, vec![a, c]);
        assert_eq!(store.line_item_count().await, 3);
    }

    #[tokio::test]
    async fn test_commit_applies_everything() {
        let store = InMemoryRecordStore::new();
        let order = Order::new(UserInformation::default());

        let mut unit = UnitOfWork::new();
        unit.stage_order(&order);
        unit.stage_line_item(LineItem::new(order.id(), "A", 2, book("A", 10)));
        unit.stage_line_item(LineItem::new(order.id(), "B", 1, book("B", 5)));
        store.commit(unit).await.unwrap();

        assert_eq!(store.order_count().await, 1);
        assert_eq!(store.find_line_items(order.id()).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_invalid_commit_writes_nothing() {
        let store = InMemoryRecordStore::new();
        let order = Order::new(UserInformation::default());

        let mut unit = UnitOfWork::new();
        unit.stage_order(&order);
        unit.stage_line_item(LineItem::new(OrderId::new(), "A", 1, book("A", 10)));

        assert!(store.commit(unit).await.is_err());
        assert_eq!(store.order_count().await, 0);
        assert_eq!(store.line_item_count().await, 0);
    }

    #[tokio::test]
    async fn test_clear() {
        let store = InMemoryRecordStore::new();
        store
            .save_order(&Order::new(UserInformation::default()))
            .await
            .unwrap();
        store.clear().await;
        assert_eq!(store.order_count().await, 0);
    }
}
