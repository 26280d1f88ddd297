//! Cloud storage error types.

use thiserror::Error;

/// Result type for cloud storage operations.
pub type CloudResult<T> = Result<T, CloudError>;

/// Errors that can occur while talking to the object store or the local
/// filesystem.
///
/// Only [`CloudError::NotFound`] is recoverable inside the engine: document
/// loads turn it into "absent". Everything else propagates unchanged, and
/// retrying is always the caller's decision.
#[derive(Debug, Error)]
pub enum CloudError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("not a directory: {0}")]
    NotADirectory(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("transfer failed: {0}")]
    Transfer(String),

    #[error("malformed document at {key}: {source}")]
    MalformedDocument {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("credential store error: {0}")]
    Credential(#[from] cloudlaunch_credentials::CredentialError),
}

impl CloudError {
    pub(crate) fn io(path: impl AsRef<std::path::Path>, source: std::io::Error) -> Self {
        CloudError::Io {
            path: path.as_ref().display().to_string(),
            source,
        }
    }

    /// True for the "no such key / no such path" family.
    pub fn is_not_found(&self) -> bool {
        matches!(self, CloudError::NotFound(_))
    }
}
