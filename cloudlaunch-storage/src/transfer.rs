//! Moving files and byte payloads between the local filesystem and the store.
//!
//! Folder uploads run up to [`UPLOAD_CONCURRENCY`] puts at once and stop at the
//! first failure. Prefix downloads are strictly sequential.

use crate::catalog::list_objects;
use crate::error::{CloudError, CloudResult};
use crate::hash::walk_files;
use crate::object_store::ObjectStore;
use crate::types::UploadSummary;
use aws_sdk_s3::primitives::ByteStream;
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Maximum number of simultaneous puts during a folder upload.
pub const UPLOAD_CONCURRENCY: usize = 6;

const JSON_CONTENT_TYPE: &str = "application/json";

/// Joins a key prefix and a relative path with exactly one `/`.
///
/// Backslashes in `relative` become `/`. An empty prefix yields the bare
/// relative path.
pub fn join_key(prefix: &str, relative: &str) -> String {
    let prefix = prefix.trim_matches('/');
    let relative = relative.replace('\\', "/");
    let relative = relative.trim_matches('/');
    if prefix.is_empty() {
        relative.to_string()
    } else {
        format!("{prefix}/{relative}")
    }
}

/// Streams one local file to `key` and returns its size in bytes.
pub async fn upload_file(
    store: &dyn ObjectStore,
    key: &str,
    path: impl AsRef<Path>,
) -> CloudResult<u64> {
    let path = path.as_ref();
    let size = tokio::fs::metadata(path)
        .await
        .map_err(|e| CloudError::io(path, e))?
        .len();
    let body = ByteStream::from_path(path)
        .await
        .map_err(|e| CloudError::io(path, std::io::Error::other(e)))?;

    store.put_object(key, body, None).await?;
    debug!("uploaded {} ({size} bytes) to {key}", path.display());
    Ok(size)
}

/// Uploads every regular file under `folder` to `prefix`.
///
/// The first failing upload cancels the rest and is returned; objects written
/// before the failure stay in the store and no summary is produced.
pub async fn upload_folder(
    store: Arc<dyn ObjectStore>,
    folder: impl AsRef<Path>,
    prefix: &str,
) -> CloudResult<UploadSummary> {
    let root = folder.as_ref().to_path_buf();
    let walk_root = root.clone();
    let files = tokio::task::spawn_blocking(move || walk_files(&walk_root))
        .await
        .map_err(|e| CloudError::io(&root, std::io::Error::other(e)))??;
    if files.is_empty() {
        info!("nothing to upload under {}", root.display());
        return Ok(UploadSummary::default());
    }

    let total = files.len();
    let semaphore = Arc::new(Semaphore::new(UPLOAD_CONCURRENCY));
    let mut tasks = JoinSet::new();
    for file in files {
        let key = join_key(prefix, &file.relative);
        let store = Arc::clone(&store);
        let semaphore = Arc::clone(&semaphore);
        tasks.spawn(async move {
            // A closed semaphore means the upload was cancelled.
            let Ok(_permit) = semaphore.acquire_owned().await else {
                return None;
            };
            let result = upload_file(store.as_ref(), &key, &file.path).await;
            Some(result.map(|bytes| (key, bytes)))
        });
    }

    let mut summary = UploadSummary::default();
    let mut first_error: Option<CloudError> = None;
    while let Some(joined) = tasks.join_next().await {
        let failure = match joined {
            Ok(Some(Ok((key, bytes)))) => {
                summary.file_count += 1;
                summary.total_bytes += bytes;
                summary.keys.push(key);
                continue;
            }
            Ok(None) => continue,
            Err(e) if e.is_cancelled() => continue,
            Ok(Some(Err(e))) => e,
            Err(e) => CloudError::Transfer(format!("upload worker failed: {e}")),
        };

        if first_error.is_none() {
            semaphore.close();
            tasks.abort_all();
            first_error = Some(failure);
        }
    }

    if let Some(err) = first_error {
        warn!(
            "upload of {} to {prefix} failed after {} of {total} files: {err}",
            root.display(),
            summary.file_count
        );
        return Err(err);
    }

    info!(
        "uploaded {} files ({} bytes) from {} to {prefix}",
        summary.file_count,
        summary.total_bytes,
        root.display()
    );
    Ok(summary)
}

/// Maps a key-relative path to a path under the destination, refusing
/// anything that would leave it.
fn local_relative_path(key: &str, relative: &str) -> CloudResult<PathBuf> {
    let mut path = PathBuf::new();
    for component in Path::new(relative).components() {
        match component {
            Component::Normal(part) => path.push(part),
            Component::CurDir => {}
            _ => {
                return Err(CloudError::Transfer(format!(
                    "refusing to download {key}: path escapes the destination"
                )));
            }
        }
    }
    Ok(path)
}

async fn create_private_dir(path: &Path) -> CloudResult<()> {
    let mut builder = tokio::fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    builder.mode(0o700);
    builder
        .create(path)
        .await
        .map_err(|e| CloudError::io(path, e))
}

async fn write_private_file(path: &Path, contents: &[u8]) -> CloudResult<()> {
    tokio::fs::write(path, contents)
        .await
        .map_err(|e| CloudError::io(path, e))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
            .await
            .map_err(|e| CloudError::io(path, e))?;
    }
    Ok(())
}

/// Recreates every object under `prefix` as a file under `destination`.
///
/// Returns the number of files written. Directory marker keys (ending in `/`)
/// are skipped. Stops at the first failure and leaves what was already
/// written in place.
pub async fn download_prefix(
    store: &dyn ObjectStore,
    prefix: &str,
    destination: impl AsRef<Path>,
) -> CloudResult<usize> {
    let written = fetch_prefix(store, prefix, destination.as_ref()).await?;
    Ok(written.len())
}

/// Like [`download_prefix`], then deletes every local file under
/// `destination` that has no object under `prefix`.
///
/// Afterwards the folder holds exactly the remote file set. Nothing is
/// removed when the download fails.
pub async fn mirror_prefix(
    store: &dyn ObjectStore,
    prefix: &str,
    destination: impl AsRef<Path>,
) -> CloudResult<usize> {
    let destination = destination.as_ref();
    let written = fetch_prefix(store, prefix, destination).await?;
    let count = written.len();
    let keep: HashSet<PathBuf> = written.into_iter().collect();

    let root = destination.to_path_buf();
    let local = tokio::task::spawn_blocking(move || walk_files(&root))
        .await
        .map_err(|e| CloudError::io(destination, std::io::Error::other(e)))??;

    let mut removed = 0;
    for file in local.iter().filter(|f| !keep.contains(&f.path)) {
        tokio::fs::remove_file(&file.path)
            .await
            .map_err(|e| CloudError::io(&file.path, e))?;
        debug!("removed {} (no longer under {prefix})", file.path.display());
        removed += 1;
    }
    if removed > 0 {
        info!(
            "removed {removed} local files missing from {prefix} under {}",
            destination.display()
        );
    }
    Ok(count)
}

async fn fetch_prefix(
    store: &dyn ObjectStore,
    prefix: &str,
    destination: &Path,
) -> CloudResult<Vec<PathBuf>> {
    let objects = list_objects(store, prefix).await?;

    let mut targets = Vec::with_capacity(objects.len());
    for obj in objects {
        let relative = obj.key.strip_prefix(prefix).unwrap_or(&obj.key);
        let relative = relative.trim_start_matches('/');
        if relative.is_empty() || relative.ends_with('/') {
            continue;
        }
        let path = destination.join(local_relative_path(&obj.key, relative)?);
        targets.push((obj.key, path));
    }

    create_private_dir(destination).await?;
    for (key, path) in &targets {
        if let Some(parent) = path.parent() {
            create_private_dir(parent).await?;
        }
        let body = store.get_object(key).await?;
        write_private_file(path, &body).await?;
        debug!("downloaded {key} to {}", path.display());
    }

    info!(
        "downloaded {} files from {prefix} to {}",
        targets.len(),
        destination.display()
    );
    Ok(targets.into_iter().map(|(_, path)| path).collect())
}

/// Fetches one object fully into memory.
pub async fn download_object(store: &dyn ObjectStore, key: &str) -> CloudResult<Vec<u8>> {
    store.get_object(key).await
}

/// Serializes `payload` and writes it as `application/json`.
pub async fn upload_json<T>(store: &dyn ObjectStore, key: &str, payload: &T) -> CloudResult<()>
where
    T: Serialize + ?Sized,
{
    let bytes = serde_json::to_vec(payload)?;
    store
        .put_object(key, ByteStream::from(bytes), Some(JSON_CONTENT_TYPE))
        .await
}

/// Writes raw bytes, setting the content type only when it is non-blank.
pub async fn upload_bytes(
    store: &dyn ObjectStore,
    key: &str,
    payload: Vec<u8>,
    content_type: &str,
) -> CloudResult<()> {
    let content_type = (!content_type.trim().is_empty()).then_some(content_type);
    store
        .put_object(key, ByteStream::from(payload), content_type)
        .await
}
