//! Record store error types.

use thiserror::Error;

/// Errors that can occur when reading or writing order records.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A unit of work was malformed and nothing was written.
    #[error("Invalid unit of work: {0}")]
    InvalidUnitOfWork(String),

    /// A persisted row could not be mapped back to a domain record.
    #[error("Corrupt record: {0}")]
    CorruptRecord(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for record store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
