//! Tests for the file-per-bucket store

use super::*;
use crate::StoreError;
use theia_filter::FilterSpec;

fn make_event(id: &str, timestamp: f64, tags: &[&str]) -> Event {
    Event::new(
        id,
        timestamp,
        "test-source",
        tags.iter().map(|t| t.to_string()).collect(),
        format!("content of {id}"),
    )
}

fn spec(json: &str) -> FilterSpec {
    FilterSpec::from_json(json).unwrap()
}

async fn collect_ids(store: &FileStore, json: &str) -> Vec<String> {
    let mut rx = store.search(&spec(json)).await.unwrap();
    let mut ids = Vec::new();
    while let Some(item) = rx.recv().await {
        ids.push(item.unwrap().id);
    }
    ids
}

/// The three-event fixture used by the tag and window tests
async fn seed(store: &FileStore) {
    store
        .save(&make_event("e1", 100.0, &["web"]))
        .await
        .unwrap();
    store
        .save(&make_event("e2", 200.0, &["web", "prod"]))
        .await
        .unwrap();
    store.save(&make_event("e3", 300.0, &["db"])).await.unwrap();
}

#[tokio::test]
async fn test_search_empty_store() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::open(dir.path()).unwrap();
    assert!(collect_ids(&store, "{}").await.is_empty());
}

#[tokio::test]
async fn test_save_creates_bucket_file() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::open(dir.path()).unwrap();
    store
        .save(&make_event("a", 125.0, &[]))
        .await
        .unwrap();
    // 125 falls in the [120, 180) bucket.
    assert!(dir.path().join("120").is_file());
}

#[tokio::test]
async fn test_find_by_tag_regex_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::open(dir.path()).unwrap();
    seed(&store).await;

    let ids = collect_ids(&store, r#"{"tags":["web.*"]}"#).await;
    assert_eq!(ids, vec!["e1", "e2"]);
}

#[tokio::test]
async fn test_time_window() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::open(dir.path()).unwrap();
    seed(&store).await;

    let ids = collect_ids(&store, r#"{"start":150,"end":250}"#).await;
    assert_eq!(ids, vec!["e2"]);
}

#[tokio::test]
async fn test_descending_order() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::open(dir.path()).unwrap();
    seed(&store).await;

    let ids = collect_ids(&store, r#"{"order":"desc"}"#).await;
    assert_eq!(ids, vec!["e3", "e2", "e1"]);
}

#[tokio::test]
async fn test_descending_within_one_bucket() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::open(dir.path()).unwrap();
    // All three land in the same bucket; append order must reverse.
    store.save(&make_event("a", 60.1, &[])).await.unwrap();
    store.save(&make_event("b", 60.2, &[])).await.unwrap();
    store.save(&make_event("c", 60.3, &[])).await.unwrap();

    let ids = collect_ids(&store, r#"{"order":"desc"}"#).await;
    assert_eq!(ids, vec!["c", "b", "a"]);
}

#[tokio::test]
async fn test_duplicate_ids_materialize() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::open(dir.path()).unwrap();
    let event = make_event("dup", 100.0, &[]);
    store.save(&event).await.unwrap();
    store.save(&event).await.unwrap();

    assert_eq!(collect_ids(&store, "{}").await, vec!["dup", "dup"]);
}

#[tokio::test]
async fn test_index_rebuilt_on_restart() {
    let dir = tempfile::tempdir().unwrap();
    {
        let store = FileStore::open(dir.path()).unwrap();
        seed(&store).await;
        store.close().await.unwrap();
    }

    let store = FileStore::open(dir.path()).unwrap();
    assert_eq!(collect_ids(&store, "{}").await, vec!["e1", "e2", "e3"]);
}

#[tokio::test]
async fn test_restart_without_close_keeps_events() {
    let dir = tempfile::tempdir().unwrap();
    {
        let store = FileStore::open(dir.path()).unwrap();
        seed(&store).await;
        // No close: simulates a process kill after the appends.
        std::mem::forget(store);
    }

    let store = FileStore::open(dir.path()).unwrap();
    assert_eq!(collect_ids(&store, "{}").await, vec!["e1", "e2", "e3"]);
}

#[tokio::test]
async fn test_half_written_tail_not_surfaced() {
    let dir = tempfile::tempdir().unwrap();
    {
        let store = FileStore::open(dir.path()).unwrap();
        seed(&store).await;
        store.close().await.unwrap();
    }

    // Simulate a crash mid-append on the newest segment.
    let tail_path = dir.path().join("300");
    let mut contents = std::fs::read(&tail_path).unwrap();
    contents.extend_from_slice(b"id:torn\ntimest");
    std::fs::write(&tail_path, &contents).unwrap();

    let store = FileStore::open(dir.path()).unwrap();
    assert_eq!(collect_ids(&store, "{}").await, vec!["e1", "e2", "e3"]);

    // The next append to that bucket truncates the torn tail for good.
    store.save(&make_event("e4", 301.0, &[])).await.unwrap();
    assert_eq!(
        collect_ids(&store, "{}").await,
        vec!["e1", "e2", "e3", "e4"]
    );
}

#[tokio::test]
async fn test_non_integer_files_ignored() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("README"), b"not a segment").unwrap();
    std::fs::write(dir.path().join("120.bak"), b"nor this").unwrap();

    let store = FileStore::open(dir.path()).unwrap();
    store.save(&make_event("a", 100.0, &[])).await.unwrap();
    assert_eq!(collect_ids(&store, "{}").await, vec!["a"]);
}

#[tokio::test]
async fn test_window_skips_disjoint_buckets() {
    let dir = tempfile::tempdir().unwrap();

    // A record misfiled into bucket 0 whose own timestamp sits inside the
    // query window. Only a scan of the disjoint bucket could surface it.
    let misfiled = serialize_to_string(&make_event("misfiled", 200.0, &[]));
    let mut segment = Vec::new();
    frame::write_record(&mut segment, misfiled.as_bytes());
    std::fs::write(dir.path().join("0"), &segment).unwrap();

    let store = FileStore::open(dir.path()).unwrap();
    store.save(&make_event("e2", 200.0, &[])).await.unwrap();

    // Bucket 0 is disjoint from [180, 239] and must not be read.
    let ids = collect_ids(&store, r#"{"start":180,"end":239}"#).await;
    assert_eq!(ids, vec!["e2"]);

    // Without a window every bucket is scanned, misfiled record included.
    let all = collect_ids(&store, "{}").await;
    assert_eq!(all, vec!["misfiled", "e2"]);
}

#[tokio::test]
async fn test_search_does_not_block_on_future_events() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::open(dir.path()).unwrap();
    seed(&store).await;

    let mut rx = store.search(&spec("{}")).await.unwrap();
    let mut count = 0;
    while rx.recv().await.is_some() {
        count += 1;
    }
    // The stream terminated instead of waiting for more saves.
    assert_eq!(count, 3);
}

#[tokio::test]
async fn test_bad_filter_pattern_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::open(dir.path()).unwrap();
    let err = store.search(&spec(r#"{"id":"["}"#)).await.unwrap_err();
    assert!(matches!(err, StoreError::Filter(_)));
}
