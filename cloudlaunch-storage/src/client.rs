//! S3-compatible client construction and the S3 [`ObjectStore`] backend.
//!
//! Builds one client per endpoint from static access keys. Retries are
//! disabled: every call either succeeds or fails once, and retry policy
//! belongs to the caller.

use crate::config::{S3Settings, StorageConfig};
use crate::error::{CloudError, CloudResult};
use crate::object_store::{ObjectPage, ObjectStore};
use crate::types::ObjectInfo;
use async_trait::async_trait;
use aws_sdk_s3::Client as S3Client;
use aws_sdk_s3::config::retry::RetryConfig;
use aws_sdk_s3::config::timeout::TimeoutConfig;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{Delete, ObjectIdentifier};
use cloudlaunch_credentials::{Credential, CredentialStore};
use tracing::{debug, info};

/// [`ObjectStore`] backed by one bucket on an S3-compatible service.
#[derive(Clone, Debug)]
pub struct S3ObjectStore {
    client: S3Client,
    bucket: String,
}

impl S3ObjectStore {
    /// Builds a client for the resolved settings and static credentials.
    pub fn connect(settings: &S3Settings, credential: &Credential) -> Self {
        let credentials = aws_credential_types::Credentials::new(
            &credential.access_key_id,
            &credential.secret_access_key,
            None,
            None,
            "cloudlaunch-static",
        );

        let mut config_builder = aws_sdk_s3::Config::builder()
            .region(aws_types::region::Region::new(settings.region.clone()))
            .credentials_provider(credentials)
            .force_path_style(settings.force_path_style)
            .retry_config(RetryConfig::disabled())
            .timeout_config(
                TimeoutConfig::builder()
                    .operation_attempt_timeout(settings.request_timeout)
                    .build(),
            )
            .behavior_version_latest();

        if let Some(ref endpoint) = settings.endpoint {
            config_builder = config_builder.endpoint_url(endpoint);
        }

        debug!(
            "built S3 client for bucket {} (endpoint: {}, path style: {})",
            settings.bucket,
            settings.endpoint.as_deref().unwrap_or("default"),
            settings.force_path_style
        );

        Self {
            client: S3Client::from_conf(config_builder.build()),
            bucket: settings.bucket.clone(),
        }
    }

    /// Resolves `config` against `credential` and connects.
    pub fn from_config(config: &StorageConfig, credential: &Credential) -> CloudResult<Self> {
        let settings = config.resolve_s3_settings(credential)?;
        Ok(Self::connect(&settings, credential))
    }

    /// Loads the credential named `name` from `credentials` and connects.
    pub async fn from_credential_store(
        config: &StorageConfig,
        credentials: &dyn CredentialStore,
        name: &str,
    ) -> CloudResult<Self> {
        let key = config.credential_key(name);
        let credential = credentials
            .load(&key)
            .await?
            .ok_or_else(|| CloudError::Config(format!("no credential stored under {key}")))?;
        Self::from_config(config, &credential)
    }

    pub fn client(&self) -> &S3Client {
        &self.client
    }
}

/// Verifies that the store's bucket is reachable with its credentials.
pub async fn validate_store(store: &dyn ObjectStore) -> CloudResult<()> {
    store.head_bucket().await?;
    info!("validated access to bucket {}", store.bucket());
    Ok(())
}

fn is_not_found<E, R>(err: &SdkError<E, R>) -> bool
where
    E: ProvideErrorMetadata,
{
    err.as_service_error()
        .is_some_and(|e| matches!(e.code(), Some("NoSuchKey") | Some("NotFound")))
}

fn transfer_error<E, R>(action: &str, target: &str, err: &SdkError<E, R>) -> CloudError
where
    E: std::error::Error + 'static,
    R: std::fmt::Debug,
{
    CloudError::Transfer(format!("{action} failed for {target}: {}", DisplayErrorContext(err)))
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn list_page(
        &self,
        prefix: &str,
        continuation_token: Option<&str>,
    ) -> CloudResult<ObjectPage> {
        let resp = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .set_prefix((!prefix.is_empty()).then(|| prefix.to_string()))
            .set_continuation_token(continuation_token.map(str::to_string))
            .send()
            .await
            .map_err(|e| transfer_error("list", &format!("prefix {prefix:?}"), &e))?;

        let objects = resp
            .contents()
            .iter()
            .filter_map(|obj| {
                let key = obj.key()?;
                Some(ObjectInfo {
                    key: key.to_string(),
                    size: obj.size().unwrap_or(0),
                    last_modified: obj
                        .last_modified()
                        .and_then(|t| t.to_millis().ok())
                        .unwrap_or(0),
                })
            })
            .collect();

        let next_continuation_token = if resp.is_truncated() == Some(true) {
            resp.next_continuation_token().map(str::to_string)
        } else {
            None
        };

        Ok(ObjectPage {
            objects,
            next_continuation_token,
        })
    }

    async fn get_object(&self, key: &str) -> CloudResult<Vec<u8>> {
        let resp = match self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(e) if is_not_found(&e) => return Err(CloudError::NotFound(key.to_string())),
            Err(e) => return Err(transfer_error("download", key, &e)),
        };

        let body = resp
            .body
            .collect()
            .await
            .map_err(|e| CloudError::Transfer(format!("failed to read body for {key}: {e}")))?;

        let bytes = body.into_bytes().to_vec();
        debug!(
            "downloaded {} bytes from s3://{}/{key}",
            bytes.len(),
            self.bucket
        );
        Ok(bytes)
    }

    async fn put_object(
        &self,
        key: &str,
        body: ByteStream,
        content_type: Option<&str>,
    ) -> CloudResult<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(body)
            .set_content_type(content_type.map(str::to_string))
            .send()
            .await
            .map_err(|e| transfer_error("upload", key, &e))?;

        debug!("uploaded s3://{}/{key}", self.bucket);
        Ok(())
    }

    async fn delete_object(&self, key: &str) -> CloudResult<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| transfer_error("delete", key, &e))?;
        Ok(())
    }

    async fn delete_objects(&self, keys: &[String]) -> CloudResult<()> {
        let identifiers = keys
            .iter()
            .map(|k| ObjectIdentifier::builder().key(k).build())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| CloudError::Transfer(format!("invalid delete request: {e}")))?;
        let delete = Delete::builder()
            .set_objects(Some(identifiers))
            .build()
            .map_err(|e| CloudError::Transfer(format!("invalid delete request: {e}")))?;

        let resp = self
            .client
            .delete_objects()
            .bucket(&self.bucket)
            .delete(delete)
            .send()
            .await
            .map_err(|e| transfer_error("batch delete", &format!("{} keys", keys.len()), &e))?;

        if let Some(failed) = resp.errors().first() {
            return Err(CloudError::Transfer(format!(
                "batch delete rejected {} of {} keys, first {}: {}",
                resp.errors().len(),
                keys.len(),
                failed.key().unwrap_or("<unknown>"),
                failed.code().unwrap_or("<no code>")
            )));
        }

        debug!("deleted {} objects from s3://{}", keys.len(), self.bucket);
        Ok(())
    }

    async fn head_bucket(&self) -> CloudResult<()> {
        match self.client.head_bucket().bucket(&self.bucket).send().await {
            Ok(_) => Ok(()),
            Err(e) if is_not_found(&e) => Err(CloudError::NotFound(format!(
                "bucket {}",
                self.bucket
            ))),
            Err(e) => Err(transfer_error("head bucket", &self.bucket, &e)),
        }
    }
}
