//! Cloud storage configuration.

use crate::error::{CloudError, CloudResult};
use cloudlaunch_credentials::Credential;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the storage engine.
///
/// Credential fields (bucket, region, endpoint) take precedence over these
/// values when they are non-blank; see [`StorageConfig::resolve_s3_settings`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StorageConfig {
    /// S3 endpoint, with or without scheme (e.g. "minio.local:9000").
    pub endpoint: Option<String>,

    /// Region name. R2 and most S3-compatible services accept "auto".
    pub region: String,

    /// Default bucket when the credential does not name one.
    pub bucket: Option<String>,

    /// Use path-style addressing (`endpoint/bucket/key`) instead of virtual hosts.
    pub force_path_style: bool,

    /// Scheme to prepend when `endpoint` has none.
    pub use_tls: bool,

    /// Per-request timeout applied by the HTTP client.
    pub request_timeout_secs: u64,

    /// Key of the game metadata catalog document.
    pub metadata_key: String,

    /// Namespace credential backends prefix their entries with.
    pub credential_namespace: String,

    /// Default log level when `RUST_LOG` is unset.
    pub log_level: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            region: "auto".to_string(),
            bucket: None,
            force_path_style: false,
            use_tls: true,
            request_timeout_secs: 60,
            metadata_key: "games.json".to_string(),
            credential_namespace: "CloudLaunch".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Fully resolved connection settings for one S3 endpoint.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct S3Settings {
    /// Normalized endpoint URL; `None` uses the provider default.
    pub endpoint: Option<String>,
    pub region: String,
    pub bucket: String,
    pub force_path_style: bool,
    pub request_timeout: Duration,
}

impl StorageConfig {
    /// Reads `CLOUDLAUNCH_*` environment variables over the defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`StorageConfig::from_env`] with an injectable variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        Self {
            endpoint: get("CLOUDLAUNCH_S3_ENDPOINT"),
            region: get("CLOUDLAUNCH_S3_REGION").unwrap_or(defaults.region),
            bucket: get("CLOUDLAUNCH_S3_BUCKET"),
            force_path_style: get("CLOUDLAUNCH_S3_FORCE_PATH_STYLE")
                .map_or(defaults.force_path_style, |v| parse_bool(&v)),
            use_tls: get("CLOUDLAUNCH_S3_USE_TLS").map_or(defaults.use_tls, |v| parse_bool(&v)),
            request_timeout_secs: get("CLOUDLAUNCH_S3_REQUEST_TIMEOUT_SECS")
                .and_then(|v| v.parse::<u64>().ok())
                .filter(|&secs| secs > 0)
                .unwrap_or(defaults.request_timeout_secs),
            metadata_key: get("CLOUDLAUNCH_CLOUD_METADATA_KEY").unwrap_or(defaults.metadata_key),
            credential_namespace: get("CLOUDLAUNCH_CREDENTIAL_NAMESPACE")
                .unwrap_or(defaults.credential_namespace),
            log_level: get("CLOUDLAUNCH_LOG_LEVEL").unwrap_or(defaults.log_level),
        }
    }

    /// Key a credential named `name` is stored under, e.g. `CloudLaunch.default`.
    pub fn credential_key(&self, name: &str) -> String {
        format!("{}.{}", self.credential_namespace, name.trim())
    }

    /// Merges a credential over this config. Fails when no bucket is known.
    pub fn resolve_s3_settings(&self, credential: &Credential) -> CloudResult<S3Settings> {
        let bucket = first_non_blank([Some(credential.bucket_name.as_str()), self.bucket.as_deref()])
            .ok_or_else(|| CloudError::Config("no bucket configured".to_string()))?;
        let region = first_non_blank([Some(credential.region.as_str()), Some(self.region.as_str())])
            .unwrap_or_else(|| "auto".to_string());
        let endpoint =
            first_non_blank([Some(credential.endpoint.as_str()), self.endpoint.as_deref()]);

        Ok(S3Settings {
            endpoint: endpoint.and_then(|e| normalize_endpoint(&e, self.use_tls)),
            region,
            bucket,
            force_path_style: self.force_path_style,
            request_timeout: Duration::from_secs(self.request_timeout_secs),
        })
    }
}

/// Adds a scheme to a bare endpoint.
///
/// Blank input yields `None`. Endpoints already starting with `http://` or
/// `https://` are returned as-is.
pub fn normalize_endpoint(endpoint: &str, use_tls: bool) -> Option<String> {
    let trimmed = endpoint.trim();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        return Some(trimmed.to_string());
    }
    let scheme = if use_tls { "https" } else { "http" };
    Some(format!("{scheme}://{trimmed}"))
}

fn first_non_blank<'a>(values: impl IntoIterator<Item = Option<&'a str>>) -> Option<String> {
    values
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|v| !v.is_empty())
        .map(str::to_string)
}

fn parse_bool(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true") || value.eq_ignore_ascii_case("yes")
}
