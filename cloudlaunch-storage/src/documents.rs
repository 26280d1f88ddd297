//! Whole-document JSON storage.
//!
//! Every document lives at one key and is rewritten in full on save. There is
//! no concurrency control: two writers racing on the same key both succeed
//! and the last put to land is what remains.

use crate::error::{CloudError, CloudResult};
use crate::keys::{save_hash_key, sessions_key};
use crate::object_store::ObjectStore;
use crate::transfer::upload_json;
use crate::types::{CloudMetadata, CloudSessionRecord, SaveHashMetadata};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

/// Loads and decodes the document at `key`. A missing key is `Ok(None)`.
pub async fn load_document<T: DeserializeOwned>(
    store: &dyn ObjectStore,
    key: &str,
) -> CloudResult<Option<T>> {
    let bytes = match store.get_object(key).await {
        Ok(bytes) => bytes,
        Err(CloudError::NotFound(_)) => {
            debug!("document {key} does not exist");
            return Ok(None);
        }
        Err(e) => return Err(e),
    };

    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|source| CloudError::MalformedDocument {
            key: key.to_string(),
            source,
        })
}

/// Overwrites the document at `key` with `value`.
pub async fn save_document<T: Serialize + ?Sized>(
    store: &dyn ObjectStore,
    key: &str,
    value: &T,
) -> CloudResult<()> {
    upload_json(store, key, value).await?;
    debug!("saved document {key}");
    Ok(())
}

pub async fn load_metadata(
    store: &dyn ObjectStore,
    metadata_key: &str,
) -> CloudResult<Option<CloudMetadata>> {
    load_document(store, metadata_key).await
}

pub async fn save_metadata(
    store: &dyn ObjectStore,
    metadata_key: &str,
    metadata: &CloudMetadata,
) -> CloudResult<()> {
    save_document(store, metadata_key, metadata).await
}

/// Loads a game's session list.
pub async fn load_sessions(
    store: &dyn ObjectStore,
    game_id: &str,
) -> CloudResult<Option<Vec<CloudSessionRecord>>> {
    load_document(store, &sessions_key(game_id)).await
}

pub async fn save_sessions(
    store: &dyn ObjectStore,
    game_id: &str,
    sessions: &[CloudSessionRecord],
) -> CloudResult<()> {
    save_document(store, &sessions_key(game_id), sessions).await
}

/// Loads a game's save-folder fingerprint. `None` means never synced.
pub async fn load_save_hash(
    store: &dyn ObjectStore,
    game_id: &str,
) -> CloudResult<Option<SaveHashMetadata>> {
    load_document(store, &save_hash_key(game_id)).await
}

pub async fn save_save_hash(
    store: &dyn ObjectStore,
    game_id: &str,
    metadata: &SaveHashMetadata,
) -> CloudResult<()> {
    save_document(store, &save_hash_key(game_id), metadata).await
}
