//! Cloud save-data sync engine for CloudLaunch.
//!
//! Moves per-game save folders and small JSON documents between the local
//! filesystem and an S3-compatible bucket:
//! - Directory fingerprints for change detection ([`hash`])
//! - Paginated listing and batched prefix deletion ([`catalog`])
//! - Bounded-concurrency folder upload and sequential download ([`transfer`])
//! - Whole-document JSON storage ([`documents`])
//! - Upload/download/skip decisions per game ([`save_sync`])
//! - Game catalog and session reconciliation ([`game_sync`])

pub mod catalog;
pub mod client;
pub mod config;
pub mod documents;
pub mod error;
pub mod game_sync;
pub mod hash;
pub mod keys;
pub mod logging;
pub mod object_store;
pub mod save_sync;
pub mod transfer;
pub mod types;

pub use client::{S3ObjectStore, validate_store};
pub use config::StorageConfig;
pub use error::{CloudError, CloudResult};
pub use game_sync::{CloudSyncSummary, LocalGameRecords, sync_games};
pub use object_store::{ObjectPage, ObjectStore};
pub use types::*;
