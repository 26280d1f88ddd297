//! Credential store error types.

use thiserror::Error;

/// Result type for credential store operations.
pub type CredentialResult<T> = Result<T, CredentialError>;

/// Errors raised by credential backends.
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("credential I/O failed for {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("credential serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid credential key: {0:?}")]
    InvalidKey(String),
}
