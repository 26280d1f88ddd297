//! Integration tests for the S3 backend against real MinIO.
//!
//! Requires: `docker compose -f docker-compose.test.yml up -d`, then
//! `cargo test -p cloudlaunch-storage -- --ignored`.

mod support;

use cloudlaunch_credentials::Credential;
use cloudlaunch_storage::catalog::{delete_objects_by_prefix, list_objects};
use cloudlaunch_storage::documents::{load_save_hash, save_save_hash};
use cloudlaunch_storage::object_store::ObjectStore;
use cloudlaunch_storage::transfer::{download_prefix, upload_folder};
use cloudlaunch_storage::{S3ObjectStore, SaveHashMetadata, StorageConfig, validate_store};
use pretty_assertions::assert_eq;
use serial_test::serial;
use std::sync::Arc;

fn minio_credential() -> Credential {
    Credential {
        access_key_id: "cloudlaunch-test".into(),
        secret_access_key: "cloudlaunch-test-secret".into(),
        bucket_name: "cloudlaunch-saves".into(),
        region: "us-east-1".into(),
        endpoint: "localhost:9000".into(),
    }
}

fn minio_store() -> Arc<S3ObjectStore> {
    let config = StorageConfig {
        use_tls: false,
        force_path_style: true,
        ..StorageConfig::default()
    };
    Arc::new(S3ObjectStore::from_config(&config, &minio_credential()).unwrap())
}

#[tokio::test]
#[ignore]
#[serial]
async fn bucket_is_reachable() {
    let store = minio_store();
    validate_store(store.as_ref()).await.unwrap();
}

#[tokio::test]
#[ignore]
#[serial]
async fn missing_key_is_not_found() {
    let store = minio_store();
    let key = format!("{}/missing.json", support::unique_prefix());

    let err = store.get_object(&key).await.unwrap_err();
    assert!(err.is_not_found(), "got {err:?}");
    assert!(load_save_hash(store.as_ref(), &key).await.unwrap().is_none());
}

#[tokio::test]
#[ignore]
#[serial]
async fn folder_roundtrip_and_prefix_delete() {
    let store = minio_store();
    let prefix = support::unique_prefix();
    let src = tempfile::tempdir().unwrap();
    support::write_tree(src.path(), &[("a.sav", "alpha"), ("nested/b.sav", "beta")]);

    let shared: Arc<dyn ObjectStore> = store.clone();
    let summary = upload_folder(shared, src.path(), &prefix).await.unwrap();
    assert_eq!(summary.file_count, 2);

    let dst = tempfile::tempdir().unwrap();
    let written = download_prefix(store.as_ref(), &prefix, dst.path())
        .await
        .unwrap();
    assert_eq!(written, 2);
    assert_eq!(std::fs::read(dst.path().join("nested/b.sav")).unwrap(), b"beta");

    delete_objects_by_prefix(store.as_ref(), &prefix).await.unwrap();
    assert!(list_objects(store.as_ref(), &prefix).await.unwrap().is_empty());
}

#[tokio::test]
#[ignore]
#[serial]
async fn save_hash_document_roundtrip() {
    let store = minio_store();
    let game_id = support::unique_prefix().replace('/', "-");
    let meta = SaveHashMetadata::now("f".repeat(64));

    save_save_hash(store.as_ref(), &game_id, &meta).await.unwrap();
    let loaded = load_save_hash(store.as_ref(), &game_id).await.unwrap();
    assert_eq!(loaded, Some(meta));

    delete_objects_by_prefix(store.as_ref(), &format!("games/{game_id}/"))
        .await
        .unwrap();
}
