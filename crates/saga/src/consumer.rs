//! Long-running consumer of dispatch notifications.

use std::sync::Arc;

use futures_util::StreamExt;
use record_store::RecordStore;

use crate::coordinator::OrderSaga;
use crate::messages::OrderDispatchedMessage;
use crate::order_fulfillment;
use crate::services::inventory::InventoryClient;
use crate::services::publisher::{EventPublisher, MessageStream};

/// Counts of messages handled by a finished consumer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsumerSummary {
    pub dispatched: usize,
    pub failed: usize,
}

/// Feeds `order-dispatched` messages to [`OrderSaga::consume_order_dispatched`].
///
/// The subscription is taken when the consumer is created, so messages
/// published after [`DispatchConsumer::subscribe`] returns are never missed
/// even if [`DispatchConsumer::run`] is spawned later.
pub struct DispatchConsumer<S, I, P>
where
    S: RecordStore,
    I: InventoryClient,
    P: EventPublisher,
{
    saga: Arc<OrderSaga<S, I, P>>,
    messages: MessageStream,
}

impl<S, I, P> DispatchConsumer<S, I, P>
where
    S: RecordStore,
    I: InventoryClient,
    P: EventPublisher,
{
    /// Subscribes to the dispatch channel of the saga's publisher.
    pub fn subscribe(saga: Arc<OrderSaga<S, I, P>>) -> Self {
        let messages = saga
            .publisher()
            .subscribe(order_fulfillment::ORDER_DISPATCHED_CHANNEL);
        Self { saga, messages }
    }

    /// Handles messages until the channel closes.
    ///
    /// Malformed messages and failed transitions are logged and skipped;
    /// one bad message never stops the consumer.
    pub async fn run(mut self) -> ConsumerSummary {
        let mut summary = ConsumerSummary::default();

        while let Some(payload) = self.messages.next().await {
            let message: OrderDispatchedMessage = match serde_json::from_value(payload) {
                Ok(message) => message,
                Err(e) => {
                    tracing::warn!(error = %e, "discarding malformed dispatch message");
                    summary.failed += 1;
                    continue;
                }
            };

            match self.saga.consume_order_dispatched(&message).await {
                Ok(_) => summary.dispatched += 1,
                Err(e) => {
                    tracing::error!(order_id = %message.order_id, error = %e, "failed to dispatch order");
                    summary.failed += 1;
                }
            }
        }

        tracing::info!(
            dispatched = summary.dispatched,
            failed = summary.failed,
            "dispatch consumer stopped"
        );
        summary
    }
}
