//! Error types for tandem-core

use thiserror::Error;

/// Result type alias using tandem-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in tandem-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Task not found
    #[error("Task not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Remote store error
    #[error("Remote store error: {0}")]
    Remote(#[from] crate::remote::RemoteError),
}
