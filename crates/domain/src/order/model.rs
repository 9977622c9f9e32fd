//! Order record.

use chrono::{DateTime, Utc};
use common::OrderId;
use serde::{Deserialize, Serialize};

use super::{OrderError, OrderStatus, UserInformation};

/// A purchase order driven through its lifecycle by the order saga.
///
/// Status changes only go through the transition methods below, each of
/// which checks the state machine in [`OrderStatus`]. The total price is
/// never supplied by the caller; the saga sets it once every line item
/// has been priced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    id: OrderId,
    status: OrderStatus,
    user_information: UserInformation,
    total_price: f64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Order {
    /// Creates a new order waiting for payment with a zero total.
    pub fn new(user_information: UserInformation) -> Self {
        let now = Utc::now();
        Self {
            id: OrderId::new(),
            status: OrderStatus::WaitingForPayment,
            user_information,
            total_price: 0.0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Rebuilds an order from persisted columns.
    pub fn from_parts(
        id: OrderId,
        status: OrderStatus,
        user_information: UserInformation,
        total_price: f64,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            status,
            user_information,
            total_price,
            created_at,
            updated_at,
        }
    }

    pub fn id(&self) -> OrderId {
        self.id
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn user_information(&self) -> &UserInformation {
        &self.user_information
    }

    pub fn total_price(&self) -> f64 {
        self.total_price
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Records the priced total. Only valid while the order awaits payment.
    pub fn set_total_price(&mut self, total_price: f64) -> Result<(), OrderError> {
        if !self.status.awaits_payment() {
            return Err(self.invalid("price"));
        }
        if !total_price.is_finite() || total_price < 0.0 {
            return Err(OrderError::InvalidTotal(total_price));
        }
        self.total_price = total_price;
        self.touch();
        Ok(())
    }

    /// WAITING_FOR_PAYMENT → ACCEPTED.
    pub fn accept(&mut self) -> Result<(), OrderError> {
        if !self.status.can_accept() {
            return Err(self.invalid("accept"));
        }
        self.transition(OrderStatus::Accepted);
        Ok(())
    }

    /// WAITING_FOR_PAYMENT | ACCEPTED → REJECTED.
    pub fn reject(&mut self) -> Result<(), OrderError> {
        if !self.status.can_reject() {
            return Err(self.invalid("reject"));
        }
        self.transition(OrderStatus::Rejected);
        Ok(())
    }

    /// Moves the order to DISPATCHED.
    ///
    /// Returns `Ok(false)` when the order was already dispatched, so a
    /// redelivered notification is a no-op rather than an error.
    pub fn dispatch(&mut self) -> Result<bool, OrderError> {
        if self.status == OrderStatus::Dispatched {
            return Ok(false);
        }
        if !self.status.can_dispatch() {
            return Err(self.invalid("dispatch"));
        }
        self.transition(OrderStatus::Dispatched);
        Ok(true)
    }

    fn transition(&mut self, status: OrderStatus) {
        self.status = status;
        self.touch();
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    fn invalid(&self, action: &'static str) -> OrderError {
        OrderError::InvalidStateTransition {
            current_state: self.status,
            action,
        }
    }
}
