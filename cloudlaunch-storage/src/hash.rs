//! Content fingerprints for change detection.
//!
//! A directory fingerprint is a running SHA-256 over, for each regular file in
//! byte-sorted relative-path order: the forward-slash path, a NUL byte, and
//! the SHA-256 of the file's contents. Directories themselves contribute
//! nothing, so every empty directory has the same fingerprint.

use crate::error::{CloudError, CloudResult};
use sha2::{Digest, Sha256};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// A regular file found under a walked root.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct WalkedFile {
    pub path: PathBuf,
    /// Path relative to the root, `/`-separated.
    pub relative: String,
}

/// Hex SHA-256 of a byte payload.
pub fn sha256_hex(bytes: impl AsRef<[u8]>) -> String {
    hex::encode(Sha256::digest(bytes.as_ref()))
}

/// Fingerprints the directory tree rooted at `root`.
///
/// Runs on the blocking pool.
pub async fn hash_directory(root: impl AsRef<Path>) -> CloudResult<String> {
    let root = root.as_ref().to_path_buf();
    tokio::task::spawn_blocking(move || hash_directory_blocking(&root))
        .await
        .map_err(|e| CloudError::io("<hash worker>", std::io::Error::other(e)))?
}

/// Synchronous form of [`hash_directory`].
pub fn hash_directory_blocking(root: &Path) -> CloudResult<String> {
    let mut files = walk_files(root)?;
    files.sort_by(|a, b| a.relative.cmp(&b.relative));

    let mut hasher = Sha256::new();
    for file in &files {
        hasher.update(file.relative.as_bytes());
        hasher.update([0u8]);
        hasher.update(hash_file(&file.path)?);
    }
    Ok(hex::encode(hasher.finalize()))
}

fn hash_file(path: &Path) -> CloudResult<Vec<u8>> {
    let mut file = std::fs::File::open(path).map_err(|e| CloudError::io(path, e))?;
    let mut hasher = Sha256::new();
    std::io::copy(&mut file, &mut hasher).map_err(|e| CloudError::io(path, e))?;
    Ok(hasher.finalize().to_vec())
}

/// Checks that `root` exists and is a directory.
pub(crate) fn ensure_directory(root: &Path) -> CloudResult<()> {
    let meta = std::fs::metadata(root).map_err(|e| match e.kind() {
        ErrorKind::NotFound => CloudError::NotFound(root.display().to_string()),
        _ => CloudError::io(root, e),
    })?;
    if !meta.is_dir() {
        return Err(CloudError::NotADirectory(root.display().to_string()));
    }
    Ok(())
}

/// Collects every regular file under `root` in walk order.
///
/// Symlinks are not followed and do not count as files.
pub(crate) fn walk_files(root: &Path) -> CloudResult<Vec<WalkedFile>> {
    ensure_directory(root)?;

    let mut files = Vec::new();
    for entry in WalkDir::new(root).min_depth(1) {
        let entry = entry.map_err(|e| {
            let path = e
                .path()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| root.to_path_buf());
            let source = e
                .into_io_error()
                .unwrap_or_else(|| std::io::Error::other("filesystem loop detected"));
            CloudError::io(path, source)
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        let relative = relative_path(root, entry.path())?;
        files.push(WalkedFile {
            path: entry.into_path(),
            relative,
        });
    }
    Ok(files)
}

/// `path` relative to `root`, `/`-separated. Names that are not valid UTF-8
/// are rejected instead of being lossily converted.
fn relative_path(root: &Path, path: &Path) -> CloudResult<String> {
    let relative = path
        .strip_prefix(root)
        .map_err(|e| CloudError::io(path, std::io::Error::other(e)))?;

    let mut parts = Vec::new();
    for component in relative.components() {
        let Some(part) = component.as_os_str().to_str() else {
            let source =
                std::io::Error::new(ErrorKind::InvalidData, "file name is not valid UTF-8");
            return Err(CloudError::io(path, source));
        };
        parts.push(part);
    }
    Ok(parts.join("/"))
}
