//! Shared test helpers: an in-memory object store and scratch-tree builders.
#![allow(dead_code)]

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use cloudlaunch_storage::object_store::{ObjectPage, ObjectStore};
use cloudlaunch_storage::{CloudError, CloudResult, ObjectInfo};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredObject {
    pub body: Vec<u8>,
    pub content_type: Option<String>,
}

/// In-memory [`ObjectStore`] with failure injection.
///
/// Lists in key order, `page_size` keys per page, using the last key of a page
/// as the continuation token.
pub struct MemoryStore {
    bucket: String,
    page_size: usize,
    objects: Mutex<BTreeMap<String, StoredObject>>,
    failing_puts: Mutex<HashSet<String>>,
    failing_gets: Mutex<HashSet<String>>,
    failing_delete_batches: Mutex<HashSet<usize>>,
    delete_batches: Mutex<Vec<usize>>,
    list_calls: AtomicUsize,
    put_calls: AtomicUsize,
    put_delay: Option<Duration>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            bucket: "cloudlaunch-test".into(),
            page_size: 1000,
            objects: Mutex::new(BTreeMap::new()),
            failing_puts: Mutex::new(HashSet::new()),
            failing_gets: Mutex::new(HashSet::new()),
            failing_delete_batches: Mutex::new(HashSet::new()),
            delete_batches: Mutex::new(Vec::new()),
            list_calls: AtomicUsize::new(0),
            put_calls: AtomicUsize::new(0),
            put_delay: None,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Every put sleeps this long before completing.
    pub fn with_put_delay(mut self, delay: Duration) -> Self {
        self.put_delay = Some(delay);
        self
    }

    pub fn fail_put(&self, key: &str) {
        self.failing_puts.lock().unwrap().insert(key.to_string());
    }

    pub fn fail_get(&self, key: &str) {
        self.failing_gets.lock().unwrap().insert(key.to_string());
    }

    /// Fails the batch delete with this zero-based index.
    pub fn fail_delete_batch(&self, index: usize) {
        self.failing_delete_batches.lock().unwrap().insert(index);
    }

    pub fn insert(&self, key: &str, body: &[u8]) {
        self.objects.lock().unwrap().insert(
            key.to_string(),
            StoredObject {
                body: body.to_vec(),
                content_type: None,
            },
        );
    }

    pub fn get(&self, key: &str) -> Option<StoredObject> {
        self.objects.lock().unwrap().get(key).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        self.objects.lock().unwrap().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.objects.lock().unwrap().len()
    }

    /// Sizes of every batch delete attempted, in order.
    pub fn delete_batches(&self) -> Vec<usize> {
        self.delete_batches.lock().unwrap().clone()
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn put_calls(&self) -> usize {
        self.put_calls.load(Ordering::SeqCst)
    }

    /// Highest number of puts observed running at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn list_page(
        &self,
        prefix: &str,
        continuation_token: Option<&str>,
    ) -> CloudResult<ObjectPage> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let objects = self.objects.lock().unwrap();
        let mut matching = objects
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .filter(|(key, _)| continuation_token.is_none_or(|token| key.as_str() > token));

        let page: Vec<ObjectInfo> = matching
            .by_ref()
            .take(self.page_size)
            .map(|(key, obj)| ObjectInfo {
                key: key.clone(),
                size: obj.body.len() as i64,
                last_modified: 1_700_000_000_000,
            })
            .collect();
        let has_more = matching.next().is_some();

        Ok(ObjectPage {
            next_continuation_token: if has_more {
                page.last().map(|o| o.key.clone())
            } else {
                None
            },
            objects: page,
        })
    }

    async fn get_object(&self, key: &str) -> CloudResult<Vec<u8>> {
        if self.failing_gets.lock().unwrap().contains(key) {
            return Err(CloudError::Transfer(format!("injected failure for {key}")));
        }
        self.objects
            .lock()
            .unwrap()
            .get(key)
            .map(|o| o.body.clone())
            .ok_or_else(|| CloudError::NotFound(key.to_string()))
    }

    async fn put_object(
        &self,
        key: &str,
        body: ByteStream,
        content_type: Option<&str>,
    ) -> CloudResult<()> {
        self.put_calls.fetch_add(1, Ordering::SeqCst);
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);

        let result = async {
            if let Some(delay) = self.put_delay {
                tokio::time::sleep(delay).await;
            }
            if self.failing_puts.lock().unwrap().contains(key) {
                return Err(CloudError::Transfer(format!("injected failure for {key}")));
            }
            let bytes = body
                .collect()
                .await
                .map_err(|e| CloudError::Transfer(e.to_string()))?
                .into_bytes()
                .to_vec();
            self.objects.lock().unwrap().insert(
                key.to_string(),
                StoredObject {
                    body: bytes,
                    content_type: content_type.map(str::to_string),
                },
            );
            Ok(())
        }
        .await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn delete_object(&self, key: &str) -> CloudResult<()> {
        self.objects.lock().unwrap().remove(key);
        Ok(())
    }

    async fn delete_objects(&self, keys: &[String]) -> CloudResult<()> {
        let index = {
            let mut batches = self.delete_batches.lock().unwrap();
            batches.push(keys.len());
            batches.len() - 1
        };
        if self.failing_delete_batches.lock().unwrap().contains(&index) {
            return Err(CloudError::Transfer(format!(
                "injected failure for delete batch {index}"
            )));
        }

        let mut objects = self.objects.lock().unwrap();
        for key in keys {
            objects.remove(key);
        }
        Ok(())
    }

    async fn head_bucket(&self) -> CloudResult<()> {
        Ok(())
    }
}

/// Writes `files` (relative path, contents) under `root`, creating parents.
pub fn write_tree<B: AsRef<[u8]>>(root: &Path, files: &[(&str, B)]) {
    for (relative, contents) in files {
        let path = root.join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, contents).unwrap();
    }
}

/// A folder of `count` small files named `file_00.sav`, `file_01.sav`, ...
pub fn numbered_tree(root: &Path, count: usize) {
    for i in 0..count {
        std::fs::write(root.join(format!("file_{i:02}.sav")), format!("save {i}")).unwrap();
    }
}

/// Per-test unique key prefix to prevent collisions.
pub fn unique_prefix() -> String {
    format!("test-runs/{}", Uuid::new_v4())
}
