mod support;

use chrono::{TimeZone, Utc};
use cloudlaunch_storage::documents::{
    load_document, load_metadata, load_save_hash, load_sessions, save_metadata, save_save_hash,
    save_sessions,
};
use cloudlaunch_storage::keys::{DEFAULT_METADATA_KEY, save_hash_key, sessions_key};
use cloudlaunch_storage::{
    CloudError, CloudGameMetadata, CloudMetadata, CloudSessionRecord, SaveHashMetadata,
};
use pretty_assertions::assert_eq;
use std::collections::BTreeSet;
use std::sync::Arc;
use support::MemoryStore;

fn game(id: &str, title: &str) -> CloudGameMetadata {
    CloudGameMetadata {
        id: id.into(),
        title: title.into(),
        publisher: "Publisher".into(),
        image_key: None,
        total_play_time: 3600,
        play_status: "playing".into(),
        tags: BTreeSet::from(["rpg".to_string()]),
        last_played: None,
        cleared_at: None,
        current_chapter: None,
        created_at: None,
        updated_at: None,
    }
}

#[tokio::test]
async fn absent_documents_load_as_none() {
    let store = MemoryStore::new();

    assert!(load_metadata(&store, DEFAULT_METADATA_KEY).await.unwrap().is_none());
    assert!(load_sessions(&store, "g1").await.unwrap().is_none());
    assert!(load_save_hash(&store, "g1").await.unwrap().is_none());
}

#[tokio::test]
async fn metadata_round_trips_through_store() {
    let store = MemoryStore::new();
    let mut metadata = CloudMetadata::new();
    metadata.upsert_game(game("g1", "Elden Ring"));
    metadata.upsert_game(game("g2", "Celeste"));

    save_metadata(&store, DEFAULT_METADATA_KEY, &metadata).await.unwrap();
    let loaded = load_metadata(&store, DEFAULT_METADATA_KEY)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(loaded, metadata);
    assert_eq!(
        store.get(DEFAULT_METADATA_KEY).unwrap().content_type.as_deref(),
        Some("application/json")
    );
}

#[tokio::test]
async fn sessions_stored_under_game_key() {
    let store = MemoryStore::new();
    let sessions = vec![CloudSessionRecord {
        id: "s1".into(),
        played_at: Utc.with_ymd_and_hms(2024, 5, 1, 20, 0, 0).unwrap(),
        duration: 5400,
        session_name: Some("Boss rush".into()),
        updated_at: Utc.with_ymd_and_hms(2024, 5, 1, 21, 30, 0).unwrap(),
    }];

    save_sessions(&store, "g1", &sessions).await.unwrap();

    assert!(store.get(&sessions_key("g1")).is_some());
    assert_eq!(load_sessions(&store, "g1").await.unwrap().unwrap(), sessions);
}

#[tokio::test]
async fn malformed_document_names_its_key() {
    let store = MemoryStore::new();
    store.insert(&save_hash_key("g1"), b"{not json");

    let err = load_save_hash(&store, "g1").await.unwrap_err();
    match err {
        CloudError::MalformedDocument { key, .. } => assert_eq!(key, save_hash_key("g1")),
        other => panic!("expected MalformedDocument, got {other:?}"),
    }
}

#[tokio::test]
async fn wrong_shape_is_malformed_too() {
    let store = MemoryStore::new();
    store.insert("doc.json", br#"{"hash": 42}"#);

    let err = load_document::<SaveHashMetadata>(&store, "doc.json")
        .await
        .unwrap_err();
    assert!(matches!(err, CloudError::MalformedDocument { .. }));
}

#[tokio::test]
async fn metadata_without_version_loads_as_version_zero() {
    let store = MemoryStore::new();
    store.insert(
        DEFAULT_METADATA_KEY,
        br#"{"games":[{"id":"g1","title":"T","publisher":"P","playStatus":"unplayed"}]}"#,
    );

    let loaded = load_metadata(&store, DEFAULT_METADATA_KEY)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(loaded.version, 0);
    assert_eq!(loaded.games[0].total_play_time, 0);
    assert!(loaded.games[0].tags.is_empty());
}

#[tokio::test]
async fn save_overwrites_whole_document() {
    let store = MemoryStore::new();
    let mut first = CloudMetadata::new();
    first.upsert_game(game("g1", "A"));
    first.upsert_game(game("g2", "B"));
    save_metadata(&store, DEFAULT_METADATA_KEY, &first).await.unwrap();

    let mut second = CloudMetadata::new();
    second.upsert_game(game("g3", "C"));
    save_metadata(&store, DEFAULT_METADATA_KEY, &second).await.unwrap();

    let loaded = load_metadata(&store, DEFAULT_METADATA_KEY)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(loaded.games.len(), 1);
    assert_eq!(loaded.games[0].id, "g3");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_save_hash_writes_leave_exactly_one_value() {
    let store = Arc::new(MemoryStore::new());
    let a = SaveHashMetadata::now("a".repeat(64));
    let b = SaveHashMetadata::now("b".repeat(64));

    let (ra, rb) = tokio::join!(
        {
            let store = Arc::clone(&store);
            let a = a.clone();
            tokio::spawn(async move { save_save_hash(store.as_ref(), "g1", &a).await })
        },
        {
            let store = Arc::clone(&store);
            let b = b.clone();
            tokio::spawn(async move { save_save_hash(store.as_ref(), "g1", &b).await })
        }
    );
    ra.unwrap().unwrap();
    rb.unwrap().unwrap();

    let stored = load_save_hash(store.as_ref(), "g1").await.unwrap().unwrap();
    assert!(stored == a || stored == b, "unexpected merge: {stored:?}");
}
