//! Save folder synchronization for one game.
//!
//! Three fingerprints drive the decision: the local folder's current hash,
//! the hash recorded at the last successful sync on this machine, and the
//! hash stored in the bucket. Only one side may have changed since the last
//! sync; when both did, nothing is transferred and the caller gets
//! [`SaveSyncAction::Conflict`].
//!
//! Transfers mirror the winning side: an upload deletes remote files that are
//! gone locally and a download deletes local files that are gone remotely, so
//! the recorded hash keeps describing what is stored.

use crate::catalog::prune_prefix;
use crate::documents::{load_save_hash, save_save_hash};
use crate::error::{CloudError, CloudResult};
use crate::hash::{hash_directory, sha256_hex};
use crate::keys::save_data_prefix;
use crate::object_store::ObjectStore;
use crate::transfer::{mirror_prefix, upload_folder};
use crate::types::{SaveHashMetadata, UploadSummary};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SaveSyncAction {
    Upload,
    Download,
    Skip,
    Conflict,
}

/// Decides what to do with a save folder.
///
/// `local_hash` is `None` when the local folder is missing or holds no files;
/// `remote_hash` is `None` when the bucket has no fingerprint for the game.
pub fn plan_save_sync(
    local_hash: Option<&str>,
    last_synced_hash: Option<&str>,
    remote_hash: Option<&str>,
) -> SaveSyncAction {
    let Some(local) = local_hash else {
        return match remote_hash {
            Some(_) => SaveSyncAction::Download,
            None => SaveSyncAction::Skip,
        };
    };
    let Some(remote) = remote_hash else {
        return SaveSyncAction::Upload;
    };

    if local == remote {
        SaveSyncAction::Skip
    } else if last_synced_hash == Some(local) {
        SaveSyncAction::Download
    } else if last_synced_hash == Some(remote) {
        SaveSyncAction::Upload
    } else {
        SaveSyncAction::Conflict
    }
}

#[derive(Clone, Debug)]
pub struct SaveSyncRequest {
    pub game_id: String,
    /// Game title; names the remote save folder.
    pub title: String,
    pub local_dir: PathBuf,
    /// Hash recorded after the last successful sync, if any.
    pub last_synced_hash: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SaveSyncOutcome {
    pub action: SaveSyncAction,
    /// Fingerprint both sides share after the sync. For a conflict, the local
    /// fingerprint.
    pub hash: Option<String>,
    /// Present only for uploads.
    pub upload: Option<UploadSummary>,
}

/// Hash of the local save folder, or `None` when it is missing or empty.
pub async fn local_save_hash(dir: &Path) -> CloudResult<Option<String>> {
    match hash_directory(dir).await {
        Ok(hash) if hash == sha256_hex(b"") => Ok(None),
        Ok(hash) => Ok(Some(hash)),
        Err(CloudError::NotFound(_)) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Plans and performs the sync for one game's save folder.
pub async fn sync_save_data(
    store: Arc<dyn ObjectStore>,
    request: &SaveSyncRequest,
) -> CloudResult<SaveSyncOutcome> {
    let local = local_save_hash(&request.local_dir).await?;
    let remote = load_save_hash(store.as_ref(), &request.game_id)
        .await?
        .map(|m| m.hash);
    let action = plan_save_sync(
        local.as_deref(),
        request.last_synced_hash.as_deref(),
        remote.as_deref(),
    );
    info!("save sync for game {}: {action:?}", request.game_id);

    let prefix = save_data_prefix(&request.title);
    match action {
        SaveSyncAction::Skip => Ok(SaveSyncOutcome {
            action,
            hash: local.or(remote),
            upload: None,
        }),
        SaveSyncAction::Conflict => {
            warn!(
                "save data for game {} changed both locally and remotely",
                request.game_id
            );
            Ok(SaveSyncOutcome {
                action,
                hash: local,
                upload: None,
            })
        }
        SaveSyncAction::Upload => {
            let Some(hash) = local else {
                return Err(CloudError::NotFound(
                    request.local_dir.display().to_string(),
                ));
            };
            let summary = upload_folder(Arc::clone(&store), &request.local_dir, &prefix).await?;
            let uploaded: HashSet<String> = summary.keys.iter().cloned().collect();
            let pruned = prune_prefix(store.as_ref(), &format!("{prefix}/"), &uploaded).await?;
            if pruned > 0 {
                info!(
                    "removed {pruned} remote save files for game {} deleted locally",
                    request.game_id
                );
            }
            save_save_hash(
                store.as_ref(),
                &request.game_id,
                &SaveHashMetadata::now(hash.clone()),
            )
            .await?;
            Ok(SaveSyncOutcome {
                action,
                hash: Some(hash),
                upload: Some(summary),
            })
        }
        SaveSyncAction::Download => {
            mirror_prefix(store.as_ref(), &prefix, &request.local_dir).await?;
            let hash = hash_directory(&request.local_dir).await?;
            if remote.as_deref() != Some(hash.as_str()) {
                warn!(
                    "save data for game {} hashes differently after download",
                    request.game_id
                );
            }
            Ok(SaveSyncOutcome {
                action,
                hash: Some(hash),
                upload: None,
            })
        }
    }
}
