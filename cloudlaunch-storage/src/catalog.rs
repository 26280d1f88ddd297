//! Listing and deleting objects under a key prefix.

use crate::error::CloudResult;
use crate::object_store::ObjectStore;
use crate::types::{CloudFileDetail, ObjectInfo};
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Provider hard limit on keys per batch delete request.
pub const DELETE_BATCH_LIMIT: usize = 1000;

/// Lazy cursor over listing pages.
///
/// Always starts at the first page; continuation tokens are consumed in order
/// and the cursor cannot be rewound.
pub struct ObjectPages<'a> {
    store: &'a dyn ObjectStore,
    prefix: String,
    next_token: Option<String>,
    exhausted: bool,
}

impl<'a> ObjectPages<'a> {
    pub fn new(store: &'a dyn ObjectStore, prefix: impl Into<String>) -> Self {
        Self {
            store,
            prefix: prefix.into(),
            next_token: None,
            exhausted: false,
        }
    }

    /// Fetches the next page, or `None` once the listing is exhausted.
    pub async fn next_page(&mut self) -> CloudResult<Option<Vec<ObjectInfo>>> {
        if self.exhausted {
            return Ok(None);
        }

        let page = self
            .store
            .list_page(&self.prefix, self.next_token.as_deref())
            .await?;

        self.next_token = page.next_continuation_token;
        if self.next_token.is_none() {
            self.exhausted = true;
        }
        Ok(Some(page.objects))
    }
}

/// Lists every object under `prefix` in provider order.
///
/// An empty prefix lists the whole bucket. The order is whatever the provider
/// enumerates; sort if you need determinism.
pub async fn list_objects(store: &dyn ObjectStore, prefix: &str) -> CloudResult<Vec<ObjectInfo>> {
    let mut pages = ObjectPages::new(store, prefix);
    let mut objects = Vec::new();
    while let Some(page) = pages.next_page().await? {
        objects.extend(page);
    }

    debug!(
        "listed {} objects under s3://{}/{prefix}",
        objects.len(),
        store.bucket()
    );
    Ok(objects)
}

/// Deletes everything under `prefix` in batches of [`DELETE_BATCH_LIMIT`].
///
/// Not transactional: a failing batch aborts the remaining ones and earlier
/// batches stay deleted.
pub async fn delete_objects_by_prefix(store: &dyn ObjectStore, prefix: &str) -> CloudResult<()> {
    let objects = list_objects(store, prefix).await?;
    let keys: Vec<String> = objects.into_iter().map(|o| o.key).collect();
    delete_keys(store, prefix, &keys).await
}

/// Deletes every object under `prefix` whose key is not in `keep`.
///
/// Returns the number of keys removed. Same batching and failure behavior as
/// [`delete_objects_by_prefix`].
pub async fn prune_prefix(
    store: &dyn ObjectStore,
    prefix: &str,
    keep: &HashSet<String>,
) -> CloudResult<usize> {
    let stale: Vec<String> = list_objects(store, prefix)
        .await?
        .into_iter()
        .map(|o| o.key)
        .filter(|key| !keep.contains(key))
        .collect();
    delete_keys(store, prefix, &stale).await?;
    Ok(stale.len())
}

async fn delete_keys(store: &dyn ObjectStore, prefix: &str, keys: &[String]) -> CloudResult<()> {
    if keys.is_empty() {
        return Ok(());
    }

    let batch_count = keys.len().div_ceil(DELETE_BATCH_LIMIT);
    for (idx, batch) in keys.chunks(DELETE_BATCH_LIMIT).enumerate() {
        if let Err(e) = store.delete_objects(batch).await {
            warn!(
                "delete batch {}/{batch_count} under {prefix} failed: {e}",
                idx + 1
            );
            return Err(e);
        }
    }

    info!(
        "deleted {} objects under s3://{}/{prefix} in {batch_count} batches",
        keys.len(),
        store.bucket()
    );
    Ok(())
}

/// Deletes a single object. Succeeds whether or not the key existed.
pub async fn delete_object(store: &dyn ObjectStore, key: &str) -> CloudResult<()> {
    store.delete_object(key).await
}

/// Lists `prefix` as display entries relative to the prefix.
pub async fn list_cloud_files(
    store: &dyn ObjectStore,
    prefix: &str,
) -> CloudResult<Vec<CloudFileDetail>> {
    let objects = list_objects(store, prefix).await?;
    Ok(objects
        .into_iter()
        .map(|obj| {
            let relative = obj.key.strip_prefix(prefix).unwrap_or(&obj.key);
            CloudFileDetail {
                name: obj.key.rsplit('/').next().unwrap_or(&obj.key).to_string(),
                relative_path: relative.trim_start_matches('/').to_string(),
                size: obj.size,
                last_modified: obj.last_modified,
                key: obj.key,
            }
        })
        .collect())
}

/// Sum of object sizes.
pub fn total_size(objects: &[ObjectInfo]) -> i64 {
    objects.iter().map(|o| o.size).sum()
}
