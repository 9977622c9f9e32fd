//! Value objects for the order domain.

use serde::{Deserialize, Serialize};

use super::OrderError;

/// Catalog data for one book, as returned by the catalog service.
///
/// A copy is stored with every line item so the price charged stays fixed
/// even if the catalog changes after submission.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BookSnapshot {
    pub isbn: String,
    pub title: String,
    pub author: String,
    pub publisher: String,
    pub supplier: String,
    /// Unit price in whole VND.
    pub price: i64,
    pub photos: Vec<String>,
    /// Copies available at lookup time.
    pub inventory: i32,
}

impl BookSnapshot {
    /// Returns true if at least `quantity` copies were available.
    pub fn has_stock_for(&self, quantity: u32) -> bool {
        i64::from(self.inventory) >= i64::from(quantity)
    }
}

/// Contact and shipping details of the buyer.
///
/// Opaque to the saga; copied verbatim into the order-accepted event.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserInformation {
    pub full_name: String,
    pub email: String,
    pub phone_number: String,
    pub address: String,
}

/// One requested entry of a submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItemRequest {
    pub isbn: String,
    pub quantity: u32,
}

impl LineItemRequest {
    pub fn new(isbn: impl Into<String>, quantity: u32) -> Self {
        Self {
            isbn: isbn.into(),
            quantity,
        }
    }

    /// Rejects zero quantities before any catalog call is made.
    pub fn validate(&self) -> Result<(), OrderError> {
        if self.quantity == 0 {
            return Err(OrderError::InvalidQuantity {
                isbn: self.isbn.clone(),
                quantity: self.quantity,
            });
        }
        Ok(())
    }
}
