//! Common error types for the Silk service

use thiserror::Error;

/// Common result type for Silk operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors shared across the Silk crates.
///
/// HTTP-facing error mapping lives in the service crate; this type only
/// covers the store, filesystem, and configuration layers underneath it.
#[derive(Error, Debug)]
pub enum Error {
    /// Datastore operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Filesystem operation failed (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration could not be loaded or validated
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invariant violation or unexpected internal state
    #[error("Internal error: {0}")]
    Internal(String),
}
