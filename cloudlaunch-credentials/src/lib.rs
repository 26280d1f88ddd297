//! Credential material for S3-compatible storage accounts.
//!
//! The sync engine reads credentials through [`CredentialStore`] and never
//! cares which backend holds them. [`FileCredentialStore`] is the portable
//! backend; OS keychain stores implement the same trait elsewhere.

mod error;
mod file_store;

pub use error::{CredentialError, CredentialResult};
pub use file_store::FileCredentialStore;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Access material for one named storage account.
///
/// `bucket_name`, `region` and `endpoint` may be blank, in which case the
/// storage configuration supplies them.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credential {
    pub access_key_id: String,
    pub secret_access_key: String,
    #[serde(default)]
    pub bucket_name: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub endpoint: String,
}

/// Save/load/delete contract for credentials.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Creates or overwrites the credential stored under `key`.
    async fn save(&self, key: &str, credential: &Credential) -> CredentialResult<()>;

    /// Returns `Ok(None)` when nothing is configured under `key`.
    async fn load(&self, key: &str) -> CredentialResult<Option<Credential>>;

    /// Removes the credential. Deleting a missing key succeeds.
    async fn delete(&self, key: &str) -> CredentialResult<()>;
}
