use thiserror::Error;

use domain::OrderStatus;

/// Errors that can occur when interacting with the stores.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The requested document does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A conditional status update lost its race: the stored status no
    /// longer matched the expected one.
    #[error("Concurrency conflict: expected status {expected}, found {actual}")]
    ConcurrencyConflict {
        expected: OrderStatus,
        actual: OrderStatus,
    },

    /// The message carried neither text nor an image reference.
    #[error("Empty message: text or image_ref required")]
    EmptyMessage,

    /// The backend is temporarily unreachable.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

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
