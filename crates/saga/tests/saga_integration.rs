//! Integration tests for the order saga.

use std::sync::Arc;

use async_trait::async_trait;
use common::OrderId;
use domain::{BookSnapshot, LineItem, LineItemRequest, Order, OrderStatus, UserInformation};
use record_store::{InMemoryRecordStore, RecordStore, UnitOfWork};
use saga::order_fulfillment::{ORDER_ACCEPTED_CHANNEL, ORDER_DISPATCHED_CHANNEL};
use saga::{
    ConsumerSummary, DispatchConsumer, EventPublisher, InMemoryEventBus, InMemoryInventoryClient,
    OrderAcceptedMessage, OrderDispatchedMessage, OrderSaga, SagaError,
};
use serde_json::json;

type TestSaga = OrderSaga<InMemoryRecordStore, InMemoryInventoryClient, InMemoryEventBus>;

struct TestHarness {
    saga: Arc<TestSaga>,
    store: InMemoryRecordStore,
    inventory: InMemoryInventoryClient,
    bus: InMemoryEventBus,
}

impl TestHarness {
    async fn new() -> Self {
        let store = InMemoryRecordStore::new();
        let inventory = InMemoryInventoryClient::new();
        let bus = InMemoryEventBus::new();

        inventory.add_book(book("A", "Domain-Driven Design", 10, 5)).await;
        inventory.add_book(book("B", "Release It!", 5, 3)).await;

        let saga = Arc::new(OrderSaga::new(store.clone(), inventory.clone(), bus.clone()));

        Self {
            saga,
            store,
            inventory,
            bus,
        }
    }

    fn customer() -> UserInformation {
        UserInformation {
            full_name: "Nguyen Van A".to_string(),
            email: "a@example.com".to_string(),
            phone_number: "0900000000".to_string(),
            address: "1 Le Loi, District 1".to_string(),
        }
    }

    /// Submits the reference order: two copies of A and one of B.
    async fn submit_order(&self) -> Order {
        self.saga
            .submit_order(
                vec![LineItemRequest::new("A", 2), LineItemRequest::new("B", 1)],
                Self::customer(),
            )
            .await
            .unwrap()
    }
}

fn book(isbn: &str, title: &str, price: i64, inventory: i32) -> BookSnapshot {
    BookSnapshot {
        isbn: isbn.to_string(),
        title: title.to_string(),
        author: "Someone".to_string(),
        price,
        inventory,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_submit_prices_order_and_records_line_items() {
    let h = TestHarness::new().await;

    let order = h.submit_order().await;

    assert_eq!(order.status(), OrderStatus::WaitingForPayment);
    assert_eq!(order.total_price(), 25.0);

    let stored = h.store.find_order(order.id()).await.unwrap().unwrap();
    assert_eq!(stored.total_price(), 25.0);
    assert_eq!(stored.user_information(), &TestHarness::customer());

    let items = h.store.find_line_items(order.id()).await.unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].isbn(), "A");
    assert_eq!(items[1].isbn(), "B");
    let sum: f64 = items.iter().map(|item| item.line_price()).sum();
    assert_eq!(sum, stored.total_price());

    // Submission only reads stock
    assert_eq!(h.inventory.stock("A").await, Some(5));
    assert!(h.inventory.reductions().await.is_empty());
}

#[tokio::test]
async fn test_submit_insufficient_stock_commits_nothing() {
    let h = TestHarness::new().await;

    let err = h
        .saga
        .submit_order(
            vec![LineItemRequest::new("A", 1), LineItemRequest::new("B", 4)],
            TestHarness::customer(),
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        SagaError::InsufficientStock { ref isbn, requested: 4, available: 3 } if isbn == "B"
    ));
    assert_eq!(h.store.order_count().await, 0);
    assert_eq!(h.store.line_item_count().await, 0);
}

#[tokio::test]
async fn test_submit_unknown_book() {
    let h = TestHarness::new().await;

    let err = h
        .saga
        .submit_order(vec![LineItemRequest::new("Z", 1)], TestHarness::customer())
        .await
        .unwrap_err();

    assert!(matches!(err, SagaError::BookNotFound { ref isbn } if isbn == "Z"));
    assert_eq!(h.store.order_count().await, 0);
}

#[tokio::test]
async fn test_submit_catalog_outage_is_fatal() {
    let h = TestHarness::new().await;
    h.inventory.set_fail_on_lookup(true).await;

    let err = h
        .saga
        .submit_order(vec![LineItemRequest::new("A", 1)], TestHarness::customer())
        .await
        .unwrap_err();

    assert!(matches!(err, SagaError::InventoryService(_)));
    assert_eq!(h.store.order_count().await, 0);
}

#[tokio::test]
async fn test_submit_rejects_empty_and_zero_quantity() {
    let h = TestHarness::new().await;

    let empty = h
        .saga
        .submit_order(vec![], TestHarness::customer())
        .await
        .unwrap_err();
    assert!(matches!(empty, SagaError::InvalidRequest(_)));

    let zero = h
        .saga
        .submit_order(vec![LineItemRequest::new("A", 0)], TestHarness::customer())
        .await
        .unwrap_err();
    assert!(matches!(zero, SagaError::InvalidRequest(_)));
    assert_eq!(h.store.order_count().await, 0);
}

#[tokio::test]
async fn test_accept_reduces_stock_and_publishes_once() {
    let h = TestHarness::new().await;
    let order = h.submit_order().await;

    let accepted = h.saga.accept_order(order.id()).await.unwrap();

    assert_eq!(accepted.status(), OrderStatus::Accepted);
    assert_eq!(
        h.store.find_order(order.id()).await.unwrap().unwrap().status(),
        OrderStatus::Accepted
    );
    assert_eq!(h.inventory.stock("A").await, Some(3));
    assert_eq!(h.inventory.stock("B").await, Some(2));

    let events = h.bus.published(ORDER_ACCEPTED_CHANNEL);
    assert_eq!(events.len(), 1);
    let message: OrderAcceptedMessage = serde_json::from_value(events[0].clone()).unwrap();
    assert_eq!(message.order_id, order.id());
    assert_eq!(message.line_items.len(), 2);
    assert_eq!(message.user_information, TestHarness::customer());
}

#[tokio::test]
async fn test_accept_unknown_order() {
    let h = TestHarness::new().await;
    let missing = OrderId::new();

    let err = h.saga.accept_order(missing).await.unwrap_err();

    assert!(matches!(err, SagaError::OrderNotFound(id) if id == missing));
    assert!(h.bus.published(ORDER_ACCEPTED_CHANNEL).is_empty());
}

#[tokio::test]
async fn test_accept_twice_is_a_consistency_error() {
    let h = TestHarness::new().await;
    let order = h.submit_order().await;
    h.saga.accept_order(order.id()).await.unwrap();

    let err = h.saga.accept_order(order.id()).await.unwrap_err();

    assert!(matches!(err, SagaError::Consistency(_)));
    assert_eq!(h.inventory.reductions().await.len(), 2);
    assert_eq!(h.bus.published(ORDER_ACCEPTED_CHANNEL).len(), 1);
}

#[tokio::test]
async fn test_failed_reduction_restores_and_rejects() {
    let h = TestHarness::new().await;
    let order = h.submit_order().await;
    h.inventory.fail_reduce_for("B").await;

    let rejected = h.saga.accept_order(order.id()).await.unwrap();

    assert_eq!(rejected.status(), OrderStatus::Rejected);
    assert_eq!(
        h.store.find_order(order.id()).await.unwrap().unwrap().status(),
        OrderStatus::Rejected
    );
    assert_eq!(h.inventory.reductions().await, vec![("A".to_string(), 2)]);
    assert_eq!(h.inventory.restorations().await, vec![("A".to_string(), 2)]);
    assert_eq!(h.inventory.stock("A").await, Some(5));
    assert!(h.bus.published(ORDER_ACCEPTED_CHANNEL).is_empty());
}

#[tokio::test]
async fn test_publish_failure_does_not_fail_acceptance() {
    let h = TestHarness::new().await;
    let order = h.submit_order().await;
    h.bus.set_fail_on_publish(true);

    let accepted = h.saga.accept_order(order.id()).await.unwrap();

    assert_eq!(accepted.status(), OrderStatus::Accepted);
    assert!(h.bus.published(ORDER_ACCEPTED_CHANNEL).is_empty());
}

#[tokio::test]
async fn test_dispatch_is_idempotent() {
    let h = TestHarness::new().await;
    let order = h.submit_order().await;
    h.saga.accept_order(order.id()).await.unwrap();
    let message = OrderDispatchedMessage::new(order.id());

    let first = h.saga.consume_order_dispatched(&message).await.unwrap();
    let second = h.saga.consume_order_dispatched(&message).await.unwrap();

    assert_eq!(first.status(), OrderStatus::Dispatched);
    assert_eq!(second.status(), OrderStatus::Dispatched);
    assert_eq!(first.updated_at(), second.updated_at());
}

#[tokio::test]
async fn test_dispatch_overtaking_acceptance() {
    let h = TestHarness::new().await;
    let order = h.submit_order().await;

    let dispatched = h
        .saga
        .consume_order_dispatched(&OrderDispatchedMessage::new(order.id()))
        .await
        .unwrap();

    assert_eq!(dispatched.status(), OrderStatus::Dispatched);
}

#[tokio::test]
async fn test_dispatch_unknown_order() {
    let h = TestHarness::new().await;
    let missing = OrderId::new();

    let err = h
        .saga
        .consume_order_dispatched(&OrderDispatchedMessage::new(missing))
        .await
        .unwrap_err();

    assert!(matches!(err, SagaError::OrderNotFound(id) if id == missing));
}

#[tokio::test]
async fn test_dispatch_rejected_order_fails() {
    let h = TestHarness::new().await;
    let order = h.submit_order().await;
    h.saga.reject_order(order.id(), "payment failed").await.unwrap();

    let err = h
        .saga
        .consume_order_dispatched(&OrderDispatchedMessage::new(order.id()))
        .await
        .unwrap_err();

    assert!(matches!(err, SagaError::Consistency(_)));
}

#[tokio::test]
async fn test_reject_only_while_waiting_for_payment() {
    let h = TestHarness::new().await;
    let waiting = h.submit_order().await;
    let accepted = h.submit_order().await;
    h.saga.accept_order(accepted.id()).await.unwrap();

    let rejected = h.saga.reject_order(waiting.id(), "timed out").await.unwrap();
    assert_eq!(rejected.status(), OrderStatus::Rejected);

    let err = h
        .saga
        .reject_order(accepted.id(), "too late")
        .await
        .unwrap_err();
    assert!(matches!(err, SagaError::Consistency(_)));
    assert_eq!(
        h.store.find_order(accepted.id()).await.unwrap().unwrap().status(),
        OrderStatus::Accepted
    );
}

#[tokio::test]
async fn test_get_order_returns_line_items() {
    let h = TestHarness::new().await;
    let order = h.submit_order().await;

    let (found, items) = h.saga.get_order(order.id()).await.unwrap();

    assert_eq!(found, order);
    assert_eq!(items.len(), 2);
    assert!(matches!(
        h.saga.get_order(OrderId::new()).await,
        Err(SagaError::OrderNotFound(_))
    ));
}

#[tokio::test]
async fn test_consumer_handles_notifications_until_closed() {
    let h = TestHarness::new().await;
    let order = h.submit_order().await;
    h.saga.accept_order(order.id()).await.unwrap();

    let consumer = DispatchConsumer::subscribe(Arc::clone(&h.saga));
    let handle = tokio::spawn(consumer.run());

    h.bus
        .publish(
            ORDER_DISPATCHED_CHANNEL,
            serde_json::to_value(OrderDispatchedMessage::new(order.id())).unwrap(),
        )
        .await
        .unwrap();
    h.bus
        .publish(ORDER_DISPATCHED_CHANNEL, json!({ "unexpected": true }))
        .await
        .unwrap();
    h.bus
        .publish(
            ORDER_DISPATCHED_CHANNEL,
            serde_json::to_value(OrderDispatchedMessage::new(OrderId::new())).unwrap(),
        )
        .await
        .unwrap();
    h.bus.close_channel(ORDER_DISPATCHED_CHANNEL);

    let summary = handle.await.unwrap();

    assert_eq!(
        summary,
        ConsumerSummary {
            dispatched: 1,
            failed: 2
        }
    );
    assert_eq!(
        h.store.find_order(order.id()).await.unwrap().unwrap().status(),
        OrderStatus::Dispatched
    );
}

/// Hands control back to the scheduler after every order lookup, so two
/// saga calls joined on one task interleave between load and write.
#[derive(Clone)]
struct YieldingStore(InMemoryRecordStore);

#[async_trait]
impl RecordStore for YieldingStore {
    async fn save_order(&self, order: &Order) -> record_store::Result<()> {
        self.0.save_order(order).await
    }

    async fn transition_order(
        &self,
        order: &Order,
        expected: OrderStatus,
    ) -> record_store::Result<bool> {
        self.0.transition_order(order, expected).await
    }

    async fn find_order(&self, order_id: OrderId) -> record_store::Result<Option<Order>> {
        let found = self.0.find_order(order_id).await?;
        tokio::task::yield_now().await;
        Ok(found)
    }

    async fn save_line_item(&self, item: &LineItem) -> record_store::Result<()> {
        self.0.save_line_item(item).await
    }

    async fn find_line_items(&self, order_id: OrderId) -> record_store::Result<Vec<LineItem>> {
        self.0.find_line_items(order_id).await
    }

    async fn commit(&self, unit: UnitOfWork) -> record_store::Result<()> {
        self.0.commit(unit).await
    }
}

fn interleaving_saga(
    h: &TestHarness,
) -> OrderSaga<YieldingStore, InMemoryInventoryClient, InMemoryEventBus> {
    OrderSaga::new(
        YieldingStore(h.store.clone()),
        h.inventory.clone(),
        h.bus.clone(),
    )
}

#[tokio::test]
async fn test_concurrent_accepts_reduce_stock_once() {
    let h = TestHarness::new().await;
    let order = h.submit_order().await;
    let saga = interleaving_saga(&h);

    let (first, second) = tokio::join!(
        saga.accept_order(order.id()),
        saga.accept_order(order.id())
    );

    let (won, lost): (Vec<_>, Vec<_>) = [first, second].into_iter().partition(Result::is_ok);
    assert_eq!(won.len(), 1);
    assert_eq!(lost.len(), 1);
    assert_eq!(won[0].as_ref().unwrap().status(), OrderStatus::Accepted);
    assert!(matches!(lost[0], Err(SagaError::Consistency(_))));

    assert_eq!(
        h.inventory.reductions().await,
        vec![("A".to_string(), 2), ("B".to_string(), 1)]
    );
    assert_eq!(h.inventory.stock("A").await, Some(3));
    assert_eq!(h.bus.published(ORDER_ACCEPTED_CHANNEL).len(), 1);
}

#[tokio::test]
async fn test_concurrent_accept_and_reject_have_one_winner() {
    let h = TestHarness::new().await;
    let order = h.submit_order().await;
    let saga = interleaving_saga(&h);

    let (accepted, rejected) = tokio::join!(
        saga.accept_order(order.id()),
        saga.reject_order(order.id(), "customer cancelled")
    );

    assert!(accepted.is_ok() != rejected.is_ok());
    let stored = h.store.find_order(order.id()).await.unwrap().unwrap();
    if accepted.is_ok() {
        assert_eq!(stored.status(), OrderStatus::Accepted);
        assert!(matches!(rejected, Err(SagaError::Consistency(_))));
    } else {
        assert_eq!(stored.status(), OrderStatus::Rejected);
        assert!(h.inventory.reductions().await.is_empty());
        assert!(h.bus.published(ORDER_ACCEPTED_CHANNEL).is_empty());
    }
}

#[tokio::test]
async fn test_concurrent_dispatch_deliveries_are_idempotent() {
    let h = TestHarness::new().await;
    let order = h.submit_order().await;
    h.saga.accept_order(order.id()).await.unwrap();
    let saga = interleaving_saga(&h);
    let message = OrderDispatchedMessage::new(order.id());

    let (first, second) = tokio::join!(
        saga.consume_order_dispatched(&message),
        saga.consume_order_dispatched(&message)
    );

    assert_eq!(first.unwrap().status(), OrderStatus::Dispatched);
    assert_eq!(second.unwrap().status(), OrderStatus::Dispatched);
    assert_eq!(
        h.store.find_order(order.id()).await.unwrap().unwrap().status(),
        OrderStatus::Dispatched
    );
}
