//! HTTP client for the catalog service.

use std::time::Duration;

use async_trait::async_trait;
use domain::BookSnapshot;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use url::Url;

use crate::error::SagaError;
use crate::services::inventory::InventoryClient;

#[derive(Serialize)]
struct QuantityBody {
    quantity: u32,
}

/// [`InventoryClient`] backed by the catalog service's REST API.
///
/// - `GET  {base}/books/{isbn}`
/// - `POST {base}/books/{isbn}/inventory/reduce` with `{"quantity": n}`
/// - `POST {base}/books/{isbn}/inventory/restore` with `{"quantity": n}`
///
/// A 404 maps to `BookNotFound`; every other failure, including timeouts,
/// is a fatal `InventoryService` error. Nothing is retried here.
#[derive(Debug, Clone)]
pub struct HttpInventoryClient {
    client: Client,
    base_url: Url,
}

impl HttpInventoryClient {
    /// Creates a client for the catalog at `base_url` with a per-request timeout.
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self, SagaError> {
        if base_url.cannot_be_a_base() {
            return Err(SagaError::InventoryService(format!(
                "catalog url {base_url} cannot be used as a base"
            )));
        }
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SagaError::InventoryService(e.to_string()))?;
        Ok(Self { client, base_url })
    }

    /// Returns the catalog base url.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn book_url(&self, isbn: &str, tail: &[&str]) -> Result<Url, SagaError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                SagaError::InventoryService(format!("invalid catalog url {}", self.base_url))
            })?
            .pop_if_empty()
            .push("books")
            .push(isbn)
            .extend(tail);
        Ok(url)
    }

    async fn change_inventory(&self, isbn: &str, action: &str, quantity: u32) -> Result<(), SagaError> {
        let url = self.book_url(isbn, &["inventory", action])?;
        let response = self
            .client
            .post(url)
            .json(&QuantityBody { quantity })
            .send()
            .await
            .map_err(transport_error)?;

        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::NOT_FOUND => Err(SagaError::BookNotFound {
                isbn: isbn.to_string(),
            }),
            status => {
                tracing::error!(isbn, action, %status, "catalog service rejected inventory change");
                Err(SagaError::InventoryService(format!(
                    "catalog service returned {status} on inventory {action}"
                )))
            }
        }
    }
}

fn transport_error(e: reqwest::Error) -> SagaError {
    if e.is_timeout() {
        tracing::error!(error = %e, "catalog service timed out");
        SagaError::InventoryService(format!("catalog service timed out: {e}"))
    } else {
        tracing::error!(error = %e, "catalog service unreachable");
        SagaError::InventoryService(e.to_string())
    }
}

#[async_trait]
impl InventoryClient for HttpInventoryClient {
    #[tracing::instrument(skip(self))]
    async fn lookup(&self, isbn: &str) -> Result<BookSnapshot, SagaError> {
        let url = self.book_url(isbn, &[])?;
        let response = self.client.get(url).send().await.map_err(transport_error)?;

        match response.status() {
            StatusCode::NOT_FOUND => {
                tracing::warn!(isbn, "book not found in catalog");
                Err(SagaError::BookNotFound {
                    isbn: isbn.to_string(),
                })
            }
            status if status.is_success() => response
                .json::<BookSnapshot>()
                .await
                .map_err(|e| SagaError::InventoryService(format!("malformed book payload: {e}"))),
            status => {
                tracing::error!(isbn, %status, "server error when calling catalog service");
                Err(SagaError::InventoryService(format!(
                    "catalog service returned {status}"
                )))
            }
        }
    }

    #[tracing::instrument(skip(self))]
    async fn reduce_inventory(&self, isbn: &str, quantity: u32) -> Result<(), SagaError> {
        self.change_inventory(isbn, "reduce", quantity).await
    }

    #[tracing::instrument(skip(self))]
    async fn restore_inventory(&self, isbn: &str, quantity: u32) -> Result<(), SagaError> {
        self.change_inventory(isbn, "restore", quantity).await
    }
}
