//! Error types for index access.

use thiserror::Error;

/// Failure of a similarity-index operation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Invalid or unsupported configuration.
    #[error("config error: {0}")]
    Config(String),

    /// The index could not be reached.
    #[error("index unavailable: {0}")]
    Unavailable(String),

    /// The configured collection does not exist.
    #[error("collection '{0}' does not exist")]
    MissingCollection(String),

    /// Qdrant answered with an error.
    #[error("qdrant error: {0}")]
    Qdrant(String),
}

impl From<qdrant_client::QdrantError> for StoreError {
    fn from(e: qdrant_client::QdrantError) -> Self {
        let msg = e.to_string();
        let lower = msg.to_ascii_lowercase();
        if lower.contains("transport") || lower.contains("connect") || lower.contains("unavailable")
        {
            StoreError::Unavailable(msg)
        } else {
            StoreError::Qdrant(msg)
        }
    }
}
