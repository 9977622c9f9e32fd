//! Inventory client trait and in-memory implementation.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use domain::BookSnapshot;
use tokio::sync::RwLock;

use crate::error::SagaError;

/// Trait for the catalog service that owns book data and stock levels.
#[async_trait]
pub trait InventoryClient: Send + Sync {
    /// Looks up a book by isbn.
    ///
    /// Fails with `BookNotFound` when the catalog does not know the isbn and
    /// with `InventoryService` on any server-side failure.
    async fn lookup(&self, isbn: &str) -> Result<BookSnapshot, SagaError>;

    /// Removes `quantity` copies from the book's stock.
    async fn reduce_inventory(&self, isbn: &str, quantity: u32) -> Result<(), SagaError>;

    /// Puts back copies removed by an earlier `reduce_inventory`.
    async fn restore_inventory(&self, isbn: &str, quantity: u32) -> Result<(), SagaError>;
}

#[derive(Debug, Default)]
struct InMemoryInventoryState {
    books: HashMap<String, BookSnapshot>,
    reductions: Vec<(String, u32)>,
    restorations: Vec<(String, u32)>,
    fail_on_lookup: bool,
    fail_reduce_for: HashSet<String>,
}

/// In-memory catalog for testing and local runs.
#[derive(Debug, Clone, Default)]
pub struct InMemoryInventoryClient {
    state: Arc<RwLock<InMemoryInventoryState>>,
}

impl InMemoryInventoryClient {
    /// Creates a new in-memory catalog with no books.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a book.
    pub async fn add_book(&self, book: BookSnapshot) {
        self.state
            .write()
            .await
            .books
            .insert(book.isbn.clone(), book);
    }

    /// Returns the current stock of a book, if known.
    pub async fn stock(&self, isbn: &str) -> Option<i32> {
        self.state.read().await.books.get(isbn).map(|b| b.inventory)
    }

    /// Makes every lookup fail as if the catalog returned a server error.
    pub async fn set_fail_on_lookup(&self, fail: bool) {
        self.state.write().await.fail_on_lookup = fail;
    }

    /// Makes reductions for `isbn` fail as if the catalog returned a server error.
    pub async fn fail_reduce_for(&self, isbn: &str) {
        self.state
            .write()
            .await
            .fail_reduce_for
            .insert(isbn.to_string());
    }

    /// Returns every successful reduction in call order.
    pub async fn reductions(&self) -> Vec<(String, u32)> {
        self.state.read().await.reductions.clone()
    }

    /// Returns every restoration in call order.
    pub async fn restorations(&self) -> Vec<(String, u32)> {
        self.state.read().await.restorations.clone()
    }
}

#[async_trait]
impl InventoryClient for InMemoryInventoryClient {
    async fn lookup(&self, isbn: &str) -> Result<BookSnapshot, SagaError> {
        let state = self.state.read().await;

        if state.fail_on_lookup {
            return Err(SagaError::InventoryService(
                "catalog service returned 500 Internal Server Error".to_string(),
            ));
        }

        state
            .books
            .get(isbn)
            .cloned()
            .ok_or_else(|| SagaError::BookNotFound {
                isbn: isbn.to_string(),
            })
    }

    async fn reduce_inventory(&self, isbn: &str, quantity: u32) -> Result<(), SagaError> {
        let mut state = self.state.write().await;

        if state.fail_reduce_for.contains(isbn) {
            return Err(SagaError::InventoryService(format!(
                "catalog service failed to reduce inventory for {isbn}"
            )));
        }

        let book = state
            .books
            .get_mut(isbn)
            .ok_or_else(|| SagaError::BookNotFound {
                isbn: isbn.to_string(),
            })?;
        if !book.has_stock_for(quantity) {
            return Err(SagaError::InsufficientStock {
                isbn: isbn.to_string(),
                requested: quantity,
                available: book.inventory,
            });
        }
        book.inventory -= quantity as i32;
        state.reductions.push((isbn.to_string(), quantity));
        Ok(())
    }

    async fn restore_inventory(&self, isbn: &str, quantity: u32) -> Result<(), SagaError> {
        let mut state = self.state.write().await;

        let book = state
            .books
            .get_mut(isbn)
            .ok_or_else(|| SagaError::BookNotFound {
                isbn: isbn.to_string(),
            })?;
        book.inventory += quantity as i32;
        state.restorations.push((isbn.to_string(), quantity));
        Ok(())
    }
}
