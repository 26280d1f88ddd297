//! Game catalog reconciliation between the local library and the bucket.
//!
//! Every game id known on either side is compared by `updatedAt`. The newer
//! side wins: a local win rewrites the game's catalog entry and its
//! `sessions.json`, a cloud win replaces the local record and its sessions.
//! Equal timestamps are skipped. The catalog document is written once at the
//! end, and only when at least one game was uploaded.

use crate::documents::{load_metadata, load_sessions, save_metadata, save_sessions};
use crate::error::{CloudError, CloudResult};
use crate::keys::thumbnail_key;
use crate::object_store::ObjectStore;
use crate::transfer::{download_object, upload_bytes};
use crate::types::{CLOUD_METADATA_VERSION, CloudGameMetadata, CloudSessionRecord};
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};

/// A game from the local library with its play sessions.
///
/// `game.image_key` is ignored; the thumbnail comes from
/// [`LocalGameRecords::load_thumbnail`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LocalGame {
    pub game: CloudGameMetadata,
    pub sessions: Vec<CloudSessionRecord>,
}

/// Image bytes plus what is known about their format.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Thumbnail {
    pub payload: Vec<u8>,
    /// File extension, with or without the dot. May be empty.
    pub ext: String,
    pub content_type: String,
}

/// The local game library as seen by [`sync_games`].
#[async_trait]
pub trait LocalGameRecords: Send + Sync {
    /// Every local game, or only `game_id` when given. An unknown id yields
    /// an empty list.
    async fn load_games(&self, game_id: Option<&str>) -> CloudResult<Vec<LocalGame>>;

    /// The game's current thumbnail, or `None` when it has none.
    async fn load_thumbnail(&self, game_id: &str) -> CloudResult<Option<Thumbnail>>;

    /// Whether a downloaded thumbnail named `file_name` is already cached.
    async fn has_thumbnail(&self, game_id: &str, file_name: &str) -> CloudResult<bool>;

    async fn store_thumbnail(
        &self,
        game_id: &str,
        file_name: &str,
        payload: Vec<u8>,
    ) -> CloudResult<()>;

    /// Replaces the local game and all of its sessions with the cloud copy.
    ///
    /// Machine-specific settings of an existing record (executable path,
    /// save folder) are the implementation's to keep.
    async fn apply_cloud_game(
        &self,
        game: &CloudGameMetadata,
        sessions: &[CloudSessionRecord],
    ) -> CloudResult<()>;
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudSyncSummary {
    pub uploaded_games: usize,
    pub downloaded_games: usize,
    pub uploaded_sessions: usize,
    pub downloaded_sessions: usize,
    pub uploaded_images: usize,
    pub downloaded_images: usize,
    pub skipped_games: usize,
}

/// Reconciles all games, or the single game `game_id`, between `records`
/// and the catalog at `metadata_key`.
///
/// A missing catalog counts as empty. The first failing game aborts the run;
/// games handled before it keep their changes, but the catalog is not
/// rewritten.
pub async fn sync_games(
    store: &dyn ObjectStore,
    records: &dyn LocalGameRecords,
    metadata_key: &str,
    game_id: Option<&str>,
) -> CloudResult<CloudSyncSummary> {
    let game_id = match game_id.map(str::trim) {
        Some("") => return Err(CloudError::InvalidInput("game id is empty".into())),
        other => other,
    };

    let mut metadata = load_metadata(store, metadata_key)
        .await?
        .unwrap_or_default();
    let local: BTreeMap<String, LocalGame> = records
        .load_games(game_id)
        .await?
        .into_iter()
        .map(|g| (g.game.id.clone(), g))
        .collect();
    let cloud: BTreeMap<String, CloudGameMetadata> = metadata
        .games
        .iter()
        .map(|g| (g.id.clone(), g.clone()))
        .collect();

    let ids: BTreeSet<&str> = local
        .keys()
        .chain(cloud.keys())
        .map(String::as_str)
        .filter(|id| game_id.is_none_or(|wanted| *id == wanted))
        .collect();

    let mut summary = CloudSyncSummary::default();
    let mut changed = false;
    for id in ids {
        match (local.get(id), cloud.get(id)) {
            (Some(local), Some(cloud)) => match local.game.updated_at.cmp(&cloud.updated_at) {
                Ordering::Greater => {
                    let game = upload_game(store, records, local, Some(cloud), &mut summary).await?;
                    metadata.upsert_game(game);
                    changed = true;
                }
                Ordering::Less => download_game(store, records, cloud, &mut summary).await?,
                Ordering::Equal => summary.skipped_games += 1,
            },
            (Some(local), None) => {
                let game = upload_game(store, records, local, None, &mut summary).await?;
                metadata.upsert_game(game);
                changed = true;
            }
            (None, Some(cloud)) => download_game(store, records, cloud, &mut summary).await?,
            (None, None) => {}
        }
    }

    if changed {
        metadata.sort_games();
        metadata.version = CLOUD_METADATA_VERSION;
        metadata.updated_at = Some(Utc::now());
        save_metadata(store, metadata_key, &metadata).await?;
    }

    info!(
        "game sync: {} uploaded, {} downloaded, {} skipped",
        summary.uploaded_games, summary.downloaded_games, summary.skipped_games
    );
    Ok(summary)
}

async fn upload_game(
    store: &dyn ObjectStore,
    records: &dyn LocalGameRecords,
    local: &LocalGame,
    existing: Option<&CloudGameMetadata>,
    summary: &mut CloudSyncSummary,
) -> CloudResult<CloudGameMetadata> {
    let id = local.game.id.as_str();
    save_sessions(store, id, &local.sessions).await?;

    let existing_key = existing.and_then(|g| g.image_key.as_deref());
    let mut game = local.game.clone();
    game.image_key = existing_key.map(str::to_string);
    // A thumbnail that cannot be read or uploaded keeps the previous key.
    match upload_thumbnail_if_needed(store, records, id, existing_key).await {
        Ok(Some((key, uploaded))) => {
            game.image_key = Some(key);
            if uploaded {
                summary.uploaded_images += 1;
            }
        }
        Ok(None) => {}
        Err(e) => warn!("thumbnail upload for game {id} failed: {e}"),
    }

    summary.uploaded_games += 1;
    summary.uploaded_sessions += local.sessions.len();
    debug!(
        "uploaded game {id} with {} sessions",
        local.sessions.len()
    );
    Ok(game)
}

/// Returns the thumbnail key and whether it had to be uploaded.
async fn upload_thumbnail_if_needed(
    store: &dyn ObjectStore,
    records: &dyn LocalGameRecords,
    game_id: &str,
    existing_key: Option<&str>,
) -> CloudResult<Option<(String, bool)>> {
    let Some(thumbnail) = records.load_thumbnail(game_id).await? else {
        return Ok(None);
    };
    let key = thumbnail_key(
        game_id,
        &thumbnail.payload,
        &thumbnail.ext,
        &thumbnail.content_type,
    );
    if existing_key == Some(key.as_str()) {
        return Ok(Some((key, false)));
    }

    upload_bytes(store, &key, thumbnail.payload, &thumbnail.content_type).await?;
    Ok(Some((key, true)))
}

async fn download_game(
    store: &dyn ObjectStore,
    records: &dyn LocalGameRecords,
    cloud: &CloudGameMetadata,
    summary: &mut CloudSyncSummary,
) -> CloudResult<()> {
    let id = cloud.id.as_str();
    if let Some(key) = cloud.image_key.as_deref().filter(|k| !k.trim().is_empty()) {
        if download_thumbnail_if_needed(store, records, id, key).await? {
            summary.downloaded_images += 1;
        }
    }

    let sessions = load_sessions(store, id).await?.unwrap_or_default();
    let mut game = cloud.clone();
    if !sessions.is_empty() {
        game.total_play_time = sessions.iter().map(|s| s.duration).sum();
    }
    records.apply_cloud_game(&game, &sessions).await?;

    summary.downloaded_games += 1;
    summary.downloaded_sessions += sessions.len();
    debug!("downloaded game {id} with {} sessions", sessions.len());
    Ok(())
}

/// Fetches the thumbnail at `key` unless a file of that name is cached.
async fn download_thumbnail_if_needed(
    store: &dyn ObjectStore,
    records: &dyn LocalGameRecords,
    game_id: &str,
    key: &str,
) -> CloudResult<bool> {
    let file_name = key.rsplit('/').next().unwrap_or(key);
    if file_name.is_empty() {
        return Err(CloudError::InvalidInput(format!(
            "image key {key} has no file name"
        )));
    }
    if records.has_thumbnail(game_id, file_name).await? {
        return Ok(false);
    }

    let payload = download_object(store, key).await?;
    records.store_thumbnail(game_id, file_name, payload).await?;
    Ok(true)
}
