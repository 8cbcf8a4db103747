//! Error types for nearseek
//!
//! A search that finds nothing is not an error: `NotFound` is a normal
//! search result. Errors here are reserved for malformed requests and for
//! faults raised by the storage layer, which propagate unchanged.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.

use std::io;
use thiserror::Error;

/// Result type alias for nearseek operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for nearseek
#[derive(Debug, Error)]
pub enum Error {
    /// A prefix bound could not be built for the request
    ///
    /// Raised for an empty target where a non-empty key is required, for an
    /// explicit range whose upper bound does not exceed its lower bound, and
    /// for a target that lies outside an explicit bound.
    #[error("Invalid prefix bound: {0}")]
    InvalidPrefixBound(String),

    /// Fault raised by the index or its durable storage
    #[error("Storage fault: {0}")]
    StorageFault(#[from] StorageFault),

    /// Key does not fit its declared encoding
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Invalid operation or state
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// Configuration could not be read or parsed
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Faults surfaced by the storage layer
///
/// These are fatal to the current operation. Nothing in the search path
/// retries them.
#[derive(Debug, Error)]
pub enum StorageFault {
    /// I/O error while reading or writing a reconciled page
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Data corruption detected in a reconciled page
    #[error("Data corruption: {0}")]
    Corruption(String),
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::StorageFault(StorageFault::Io(e))
    }
}

impl Error {
    /// Shorthand for a corruption fault
    pub fn corruption(msg: impl Into<String>) -> Self {
        Error::StorageFault(StorageFault::Corruption(msg.into()))
    }

    /// Whether this error came from the storage layer
    pub fn is_storage_fault(&self) -> bool {
        matches!(self, Error::StorageFault(_))
    }
}
