//! File-backed credential store.
//!
//! Each credential lives in `{directory}/{key}.json`. On Unix the directory is
//! created `0700` and credential files are `0600`.

use crate::error::{CredentialError, CredentialResult};
use crate::{Credential, CredentialStore};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Stores credentials as JSON files in a single directory.
#[derive(Clone, Debug)]
pub struct FileCredentialStore {
    directory: PathBuf,
}

impl FileCredentialStore {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn file_path(&self, key: &str) -> CredentialResult<PathBuf> {
        let trimmed = key.trim();
        if trimmed.is_empty()
            || trimmed.contains(['/', '\\'])
            || trimmed == "."
            || trimmed == ".."
        {
            return Err(CredentialError::InvalidKey(key.to_string()));
        }
        Ok(self.directory.join(format!("{trimmed}.json")))
    }

    async fn ensure_directory(&self) -> CredentialResult<()> {
        let mut builder = tokio::fs::DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        builder.mode(0o700);
        builder
            .create(&self.directory)
            .await
            .map_err(|source| io_error(&self.directory, source))
    }
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn save(&self, key: &str, credential: &Credential) -> CredentialResult<()> {
        let path = self.file_path(key)?;
        self.ensure_directory().await?;

        let blob = serde_json::to_vec(credential)?;
        tokio::fs::write(&path, blob)
            .await
            .map_err(|source| io_error(&path, source))?;
        restrict_to_owner(&path).await?;

        debug!("saved credential {key} to {}", path.display());
        Ok(())
    }

    async fn load(&self, key: &str) -> CredentialResult<Option<Credential>> {
        let path = self.file_path(key)?;
        let blob = match tokio::fs::read(&path).await {
            Ok(blob) => blob,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(io_error(&path, source)),
        };

        let credential = serde_json::from_slice(&blob)?;
        Ok(Some(credential))
    }

    async fn delete(&self, key: &str) -> CredentialResult<()> {
        let path = self.file_path(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!("deleted credential {key}");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(io_error(&path, source)),
        }
    }
}

#[cfg(unix)]
async fn restrict_to_owner(path: &Path) -> CredentialResult<()> {
    use std::os::unix::fs::PermissionsExt;

    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .await
        .map_err(|source| io_error(path, source))
}

#[cfg(not(unix))]
async fn restrict_to_owner(_path: &Path) -> CredentialResult<()> {
    Ok(())
}

fn io_error(path: &Path, source: std::io::Error) -> CredentialError {
    CredentialError::Io {
        path: path.display().to_string(),
        source,
    }
}
