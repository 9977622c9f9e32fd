//! Saga coordinator driving orders through their lifecycle.

use std::time::Instant;

use common::OrderId;
use domain::{LineItem, LineItemRequest, Order, OrderError, OrderStatus, UserInformation};
use record_store::{RecordStore, UnitOfWork};

use crate::error::SagaError;
use crate::line_item::LineItemProcessor;
use crate::messages::{OrderAcceptedMessage, OrderDispatchedMessage};
use crate::order_fulfillment;
use crate::services::inventory::InventoryClient;
use crate::services::publisher::EventPublisher;

/// Orchestrates submission, acceptance and dispatch of orders.
///
/// There is no transaction spanning the catalog and the local store.
/// Submission is atomic locally through a [`UnitOfWork`]; acceptance reduces
/// catalog stock one line item at a time and restores what it already
/// reduced if a later reduction fails.
pub struct OrderSaga<S, I, P>
where
    S: RecordStore,
    I: InventoryClient,
    P: EventPublisher,
{
    store: S,
    processor: LineItemProcessor<I>,
    publisher: P,
}

impl<S, I, P> OrderSaga<S, I, P>
where
    S: RecordStore,
    I: InventoryClient,
    P: EventPublisher,
{
    /// Creates a new order saga.
    pub fn new(store: S, inventory: I, publisher: P) -> Self {
        Self {
            store,
            processor: LineItemProcessor::new(inventory),
            publisher,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn inventory(&self) -> &I {
        self.processor.inventory()
    }

    pub fn publisher(&self) -> &P {
        &self.publisher
    }

    /// Creates an order waiting for payment and prices every requested item.
    ///
    /// Items are processed sequentially in request order and the first
    /// failure aborts the rest. Nothing is persisted unless every item
    /// passes: the order and its line items are committed together.
    #[tracing::instrument(skip(self, items, user_information), fields(item_count = items.len()))]
    pub async fn submit_order(
        &self,
        items: Vec<LineItemRequest>,
        user_information: UserInformation,
    ) -> Result<Order, SagaError> {
        let started = Instant::now();

        if items.is_empty() {
            return Err(OrderError::NoItems.into());
        }
        for item in &items {
            item.validate()?;
        }

        let mut order = Order::new(user_information);
        let mut unit = UnitOfWork::new();
        unit.stage_order(&order);

        let mut total_price = 0.0;
        for item in &items {
            total_price += self.processor.process(item, &order, &mut unit).await?;
        }

        order.set_total_price(total_price)?;
        unit.stage_order(&order);
        self.store.commit(unit).await?;

        metrics::counter!("orders_submitted_total").increment(1);
        metrics::histogram!("order_submission_duration_seconds")
            .record(started.elapsed().as_secs_f64());
        tracing::info!(order_id = %order.id(), total_price, "order submitted");

        Ok(order)
    }

    /// Accepts a paid order, reduces catalog stock and announces it.
    ///
    /// If any reduction fails, the reductions already applied are restored in
    /// reverse order and the order is rejected instead. A rejected order is
    /// returned as a success and no event is published for it.
    ///
    /// Of two concurrent acceptances only one wins the status write; the
    /// other fails with [`SagaError::Consistency`] before touching stock.
    #[tracing::instrument(skip(self))]
    pub async fn accept_order(&self, order_id: OrderId) -> Result<Order, SagaError> {
        let mut order = self.load(order_id).await?;
        let loaded = order.status();
        order.accept()?;
        self.transition(&order, loaded).await?;

        let line_items = self.store.find_line_items(order_id).await?;
        let mut reduced: Vec<&LineItem> = Vec::with_capacity(line_items.len());

        for item in &line_items {
            match self
                .inventory()
                .reduce_inventory(item.isbn(), item.quantity())
                .await
            {
                Ok(()) => reduced.push(item),
                Err(e) => {
                    tracing::warn!(
                        %order_id,
                        isbn = item.isbn(),
                        error = %e,
                        "inventory reduction failed, compensating"
                    );
                    self.restore(&reduced).await;
                    order.reject()?;
                    self.transition(&order, OrderStatus::Accepted).await?;
                    metrics::counter!("orders_rejected_total").increment(1);
                    return Ok(order);
                }
            }
        }

        let message = OrderAcceptedMessage {
            order_id,
            line_items,
            user_information: order.user_information().clone(),
        };
        self.announce(order_fulfillment::ORDER_ACCEPTED_CHANNEL, &message)
            .await?;

        metrics::counter!("orders_accepted_total").increment(1);
        tracing::info!(%order_id, "order accepted");

        Ok(order)
    }

    /// Cancels an order that is still waiting for payment.
    #[tracing::instrument(skip(self))]
    pub async fn reject_order(&self, order_id: OrderId, reason: &str) -> Result<Order, SagaError> {
        let mut order = self.load(order_id).await?;
        if !order.status().awaits_payment() {
            return Err(SagaError::Consistency(format!(
                "cannot reject order {order_id} in {} state",
                order.status()
            )));
        }

        let loaded = order.status();
        order.reject()?;
        self.transition(&order, loaded).await?;

        metrics::counter!("orders_rejected_total").increment(1);
        tracing::info!(%order_id, reason, "order rejected");

        Ok(order)
    }

    /// Marks the order named by a dispatch notification as dispatched.
    ///
    /// Redelivered notifications are no-ops. A notification that overtakes
    /// its own acceptance is honoured.
    #[tracing::instrument(skip(self), fields(order_id = %message.order_id))]
    pub async fn consume_order_dispatched(
        &self,
        message: &OrderDispatchedMessage,
    ) -> Result<Order, SagaError> {
        let mut order = self.load(message.order_id).await?;
        let loaded = order.status();

        if !order.dispatch()? {
            tracing::debug!("order already dispatched");
            return Ok(order);
        }

        if !self.store.transition_order(&order, loaded).await? {
            // A concurrent delivery of the same notification got there first.
            let current = self.load(message.order_id).await?;
            if current.status() != OrderStatus::Dispatched {
                return Err(Self::lost_race(&current));
            }
            tracing::debug!("order already dispatched");
            return Ok(current);
        }

        metrics::counter!("orders_dispatched_total").increment(1);
        tracing::info!("order dispatched");

        Ok(order)
    }

    /// Loads an order together with its line items.
    pub async fn get_order(&self, order_id: OrderId) -> Result<(Order, Vec<LineItem>), SagaError> {
        let order = self.load(order_id).await?;
        let line_items = self.store.find_line_items(order_id).await?;
        Ok((order, line_items))
    }

    /// Persists `order` only if the stored copy is still `expected`.
    async fn transition(&self, order: &Order, expected: OrderStatus) -> Result<(), SagaError> {
        if self.store.transition_order(order, expected).await? {
            return Ok(());
        }

        let current = self.load(order.id()).await?;
        tracing::warn!(
            order_id = %order.id(),
            expected = %expected,
            found = %current.status(),
            "order changed concurrently"
        );
        Err(Self::lost_race(&current))
    }

    fn lost_race(current: &Order) -> SagaError {
        SagaError::Consistency(format!(
            "order {} was moved to {} concurrently",
            current.id(),
            current.status()
        ))
    }

    async fn load(&self, order_id: OrderId) -> Result<Order, SagaError> {
        self.store
            .find_order(order_id)
            .await?
            .ok_or(SagaError::OrderNotFound(order_id))
    }

    /// Puts back stock taken by `reduced`, newest first.
    ///
    /// A failed restoration is logged and the remaining ones still run.
    async fn restore(&self, reduced: &[&LineItem]) {
        for item in reduced.iter().rev() {
            if let Err(e) = self
                .inventory()
                .restore_inventory(item.isbn(), item.quantity())
                .await
            {
                tracing::error!(
                    isbn = item.isbn(),
                    quantity = item.quantity(),
                    error = %e,
                    "failed to restore inventory"
                );
            }
        }
    }

    /// Publishes `message` without waiting for it to be consumed.
    ///
    /// Broker failures are logged rather than returned; the order has
    /// already been persisted by the time this runs.
    async fn announce(
        &self,
        channel: &str,
        message: &OrderAcceptedMessage,
    ) -> Result<(), SagaError> {
        let payload = serde_json::to_value(message)?;

        match self.publisher.publish(channel, payload).await {
            Ok(delivered) => {
                metrics::counter!("order_events_published_total").increment(1);
                tracing::info!(channel, order_id = %message.order_id, delivered, "event published");
            }
            Err(e) => {
                tracing::error!(channel, order_id = %message.order_id, error = %e, "failed to publish event");
            }
        }

        Ok(())
    }
}
