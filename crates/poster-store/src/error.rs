//! Store Error Types

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, StoreError>;

/// Persistence errors
#[derive(Error, Debug)]
pub enum StoreError {
    /// Database driver error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A row vanished between the conflicting insert and the follow-up read
    #[error("Purchase conflict: {0}")]
    Conflict(String),

    /// Invalid input rejected before reaching the database
    #[error("Invalid input: {0}")]
    Invalid(String),
}

