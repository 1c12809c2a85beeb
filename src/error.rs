//! Error types for the freebies watcher.

use thiserror::Error;

/// Common error type for the freebies watcher.
#[derive(Error, Debug)]
pub enum FreebiesError {
    /// Database error.
    ///
    /// Errors from sqlx are converted into this variant.
    #[error("database error: {0}")]
    Database(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Content source could not be fetched or parsed.
    #[error("fetch error: {0}")]
    Fetch(String),

    /// A message could not be delivered.
    #[error("delivery error: {0}")]
    Delivery(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Metrics could not be registered or encoded.
    #[error("metrics error: {0}")]
    Metrics(String),
}

impl From<sqlx::Error> for FreebiesError {
    fn from(e: sqlx::Error) -> Self {
        FreebiesError::Database(e.to_string())
    }
}

impl From<prometheus::Error> for FreebiesError {
    fn from(e: prometheus::Error) -> Self {
        FreebiesError::Metrics(e.to_string())
    }
}

/// Result type alias for watcher operations.
pub type Result<T> = std::result::Result<T, FreebiesError>;
