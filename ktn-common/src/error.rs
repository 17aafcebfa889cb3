//! Common error types for KTN

use thiserror::Error;

/// Common result type for KTN operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the KTN services
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested resource not found.
    ///
    /// Expected and recoverable: a missing fingerprint means "first ingestion".
    #[error("Not found: {0}")]
    NotFound(String),

    /// Network, auth or quota failure while reading the spreadsheet source
    #[error("Remote fetch error: {0}")]
    RemoteFetch(String),

    /// A partition mutation failed and its transaction was rolled back
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Source headers without a declared field
    #[error("Schema mismatch: unmapped headers {0:?}")]
    SchemaMismatch(Vec<String>),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// True for the expected "nothing stored yet" case
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}
