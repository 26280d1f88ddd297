//! Shared types for cloud storage operations.
//!
//! Document types serialize with camelCase field names; those names are the
//! wire contract with every other client reading the bucket.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Catalog schema version written by this engine.
pub const CLOUD_METADATA_VERSION: u32 = 2;

/// One remote object as reported by a listing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectInfo {
    pub key: String,
    pub size: i64,
    /// Epoch milliseconds, 0 when the provider omits it.
    pub last_modified: i64,
}

/// Listing entry shaped for display, relative to the listed prefix.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudFileDetail {
    pub name: String,
    pub key: String,
    pub relative_path: String,
    pub size: i64,
    pub last_modified: i64,
}

/// Result of a successful folder upload.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadSummary {
    pub file_count: usize,
    pub total_bytes: u64,
    /// Written keys in completion order.
    pub keys: Vec<String>,
}

/// A game's cloud-visible summary.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudGameMetadata {
    pub id: String,
    pub title: String,
    pub publisher: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_key: Option<String>,
    #[serde(default)]
    pub total_play_time: i64,
    pub play_status: String,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_played: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cleared_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_chapter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// The per-account game catalog document.
///
/// Game ids must be unique within `games`. Nothing here deduplicates on load
/// or save; use [`CloudMetadata::upsert_game`] to keep the invariant.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudMetadata {
    #[serde(default)]
    pub version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub games: Vec<CloudGameMetadata>,
}

impl CloudMetadata {
    /// An empty catalog at the current schema version.
    pub fn new() -> Self {
        Self {
            version: CLOUD_METADATA_VERSION,
            updated_at: None,
            games: Vec::new(),
        }
    }

    pub fn find_game(&self, id: &str) -> Option<&CloudGameMetadata> {
        self.games.iter().find(|g| g.id == id)
    }

    /// Replaces the entry with the same id, or appends a new one.
    pub fn upsert_game(&mut self, game: CloudGameMetadata) {
        match self.games.iter_mut().find(|g| g.id == game.id) {
            Some(existing) => *existing = game,
            None => self.games.push(game),
        }
    }

    pub fn remove_game(&mut self, id: &str) -> Option<CloudGameMetadata> {
        let idx = self.games.iter().position(|g| g.id == id)?;
        Some(self.games.remove(idx))
    }

    /// Orders games by title, then id.
    pub fn sort_games(&mut self) {
        self.games
            .sort_by(|a, b| a.title.cmp(&b.title).then_with(|| a.id.cmp(&b.id)));
    }
}

impl Default for CloudMetadata {
    fn default() -> Self {
        Self::new()
    }
}

/// One play session in a game's session list document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudSessionRecord {
    pub id: String,
    pub played_at: DateTime<Utc>,
    /// Seconds played.
    pub duration: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_name: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// Last-known fingerprint of a game's save folder.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveHashMetadata {
    pub hash: String,
    pub updated_at: DateTime<Utc>,
}

impl SaveHashMetadata {
    pub fn now(hash: impl Into<String>) -> Self {
        Self {
            hash: hash.into(),
            updated_at: Utc::now(),
        }
    }
}
