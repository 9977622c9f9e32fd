//! Validation and pricing of one requested line item.

use domain::{LineItem, LineItemRequest, Order};
use record_store::UnitOfWork;

use crate::error::SagaError;
use crate::services::inventory::InventoryClient;

/// Prices one requested book against the catalog and stages its line item.
pub struct LineItemProcessor<I: InventoryClient> {
    inventory: I,
}

impl<I: InventoryClient> LineItemProcessor<I> {
    pub fn new(inventory: I) -> Self {
        Self { inventory }
    }

    /// Returns the catalog client.
    pub fn inventory(&self) -> &I {
        &self.inventory
    }

    /// Validates `request` for `order` and stages the resulting line item.
    ///
    /// Returns the line's contribution to the order total, the snapshotted
    /// unit price times the quantity. Stock is only read here, not reserved.
    #[tracing::instrument(skip(self, order, unit), fields(order_id = %order.id()))]
    pub async fn process(
        &self,
        request: &LineItemRequest,
        order: &Order,
        unit: &mut UnitOfWork,
    ) -> Result<f64, SagaError> {
        let book = self.inventory.lookup(&request.isbn).await?;

        if !book.has_stock_for(request.quantity) {
            tracing::warn!(
                isbn = %request.isbn,
                requested = request.quantity,
                available = book.inventory,
                "insufficient stock"
            );
            return Err(SagaError::InsufficientStock {
                isbn: request.isbn.clone(),
                requested: request.quantity,
                available: book.inventory,
            });
        }

        let item = LineItem::new(order.id(), request.isbn.as_str(), request.quantity, book);
        let contribution = item.line_price();
        unit.stage_line_item(item);

        Ok(contribution)
    }
}
