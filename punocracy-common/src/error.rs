//! Common error types for Punocracy

use thiserror::Error;

/// Common result type for Punocracy operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error taxonomy shared by every core operation
///
/// Store failures (`Database`, `Io`) are passed through unchanged; nothing in
/// the core retries them.
#[derive(Error, Debug)]
pub enum Error {
    /// Submitted input was rejected (e.g. no homophones in a phrase)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Referenced phrase, word, or rating is absent
    #[error("Not found: {0}")]
    NotFound(String),

    /// Stored data would be (or already is) inconsistent
    #[error("Data integrity error: {0}")]
    DataIntegrity(String),

    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// True for errors raised by the record store itself
    pub fn is_store_error(&self) -> bool {
        matches!(self, Error::Database(_) | Error::Io(_))
    }
}
