//! The object store seam.
//!
//! Everything above this trait (catalog, transfer, documents, save sync) is
//! written against [`ObjectStore`]. [`crate::client::S3ObjectStore`] is the
//! production implementation; tests use an in-memory one.

use crate::error::CloudResult;
use crate::types::ObjectInfo;
use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;

/// One page of a listing.
#[derive(Clone, Debug, Default)]
pub struct ObjectPage {
    pub objects: Vec<ObjectInfo>,
    /// Token for the following page, `None` on the last page.
    pub next_continuation_token: Option<String>,
}

/// Bucket-scoped object operations.
///
/// Implementations must be safe to share between concurrent upload workers.
/// Missing keys on [`ObjectStore::get_object`] must surface as
/// [`crate::CloudError::NotFound`]; provider rejections as
/// [`crate::CloudError::Transfer`].
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// The bucket every call is addressed to.
    fn bucket(&self) -> &str;

    /// Lists one page of keys under `prefix` (empty = whole bucket).
    async fn list_page(
        &self,
        prefix: &str,
        continuation_token: Option<&str>,
    ) -> CloudResult<ObjectPage>;

    /// Fetches a whole object into memory.
    async fn get_object(&self, key: &str) -> CloudResult<Vec<u8>>;

    /// Writes (or overwrites) an object.
    async fn put_object(
        &self,
        key: &str,
        body: ByteStream,
        content_type: Option<&str>,
    ) -> CloudResult<()>;

    /// Deletes one object. Deleting a missing key succeeds.
    async fn delete_object(&self, key: &str) -> CloudResult<()>;

    /// Deletes up to the provider's batch limit of keys in one request.
    async fn delete_objects(&self, keys: &[String]) -> CloudResult<()>;

    /// Checks that the bucket is reachable with the current credentials.
    async fn head_bucket(&self) -> CloudResult<()>;
}
