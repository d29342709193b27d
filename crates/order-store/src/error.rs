use common::OrderId;
use thiserror::Error;

/// Errors that can occur when interacting with the order or inventory store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The order does not exist locally.
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// No inventory row exists for the SKU.
    #[error("No inventory row for SKU: {0}")]
    SkuNotFound(String),

    /// A stored row does not satisfy the model's invariants.
    #[error("Inconsistent row for order {id}: {reason}")]
    InconsistentRow { id: i64, reason: String },

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

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
