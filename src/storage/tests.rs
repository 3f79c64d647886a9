//! Storage tests

use super::*;
use crate::error::Error;
use bytes::Bytes;
use object_store::memory::InMemory;
use object_store::path::Path as ObjectPath;
use object_store::ObjectStore;
use std::sync::Arc;
use std::time::Duration;

fn memory_location(access: Access) -> StorageLocation {
    StorageLocation::from_store(Arc::new(InMemory::new()), "memory://test/root", "root", access)
}

// ============================================================================
// Path Tests
// ============================================================================

#[test]
fn test_partition_dir() {
    let dir = partition_dir(&[
        ("region".to_string(), "us".to_string()),
        ("year".to_string(), "2018".to_string()),
    ]);
    assert_eq!(dir, "region=us/year=2018");
}

#[test]
fn test_escape_round_trip() {
    let raw = "a/b=c%d:e";
    let escaped = escape_partition_value(raw);
    assert_eq!(escaped, "a%2Fb%3Dc%25d%3Ae");
    assert_eq!(unescape_partition_value(&escaped), raw);
    assert_eq!(escape_partition_value("plain value"), "plain value");
}

#[test]
fn test_unescape_keeps_malformed() {
    assert_eq!(unescape_partition_value("50%"), "50%");
    assert_eq!(unescape_partition_value("%zz"), "%zz");
}

#[test]
fn test_parse_partition_path() {
    let values = parse_partition_path("region=us/year=2018/part-0.parquet");
    assert_eq!(values.get("region").map(String::as_str), Some("us"));
    assert_eq!(values.get("year").map(String::as_str), Some("2018"));

    let values = parse_partition_path("plain/region=a%2Fb/file.csv");
    assert_eq!(values.len(), 1);
    assert_eq!(values["region"], "a/b");

    assert!(parse_partition_path("region=us").is_empty());
}

#[test]
fn test_hidden_paths() {
    assert!(is_hidden_path("_SUCCESS"));
    assert!(is_hidden_path("region=us/_manifest.json"));
    assert!(is_hidden_path("_staging/abc/part-0.parquet"));
    assert!(is_hidden_path(".tmp/file"));
    assert!(!is_hidden_path("region=us/part-0.parquet"));
}

// ============================================================================
// Location Tests
// ============================================================================

#[tokio::test]
async fn test_put_get_list_delete() {
    let location = memory_location(Access::Write);
    location
        .put("region=us/a.parquet", Bytes::from_static(b"one"))
        .await
        .unwrap();
    location
        .put("region=gb/b.parquet", Bytes::from_static(b"two"))
        .await
        .unwrap();

    assert_eq!(
        location.get("region=us/a.parquet").await.unwrap(),
        Bytes::from_static(b"one")
    );
    assert!(location.exists("region=gb/b.parquet").await.unwrap());

    let entries = location.list("").await.unwrap();
    let paths: Vec<&str> = entries.iter().map(|e| e.path.as_str()).collect();
    assert_eq!(paths, vec!["region=gb/b.parquet", "region=us/a.parquet"]);
    assert_eq!(entries[0].size, 3);

    location.delete("region=us/a.parquet").await.unwrap();
    location.delete("region=us/a.parquet").await.unwrap();
    assert!(location.get_opt("region=us/a.parquet").await.unwrap().is_none());
}

#[tokio::test]
async fn test_list_level() {
    let location = memory_location(Access::Read);
    let store = Arc::clone(location.store());
    for key in ["root/region=us/a", "root/region=gb/b", "root/_SUCCESS"] {
        store
            .put(
                &ObjectPath::parse(key).unwrap(),
                Bytes::from_static(b"x").into(),
            )
            .await
            .unwrap();
    }

    let listing = location.list_level("").await.unwrap();
    assert_eq!(listing.dirs, vec!["region=gb", "region=us"]);
    assert_eq!(listing.files.len(), 1);
    assert_eq!(listing.files[0].path, "_SUCCESS");

    let nested = location.list_level("region=us").await.unwrap();
    assert!(nested.dirs.is_empty());
    assert_eq!(nested.files[0].path, "region=us/a");
}

#[tokio::test]
async fn test_child_location_shares_store() {
    let location = memory_location(Access::Write);
    let child = location.child("region=us/");
    assert_eq!(child.url(), "memory://test/root/region=us");

    child.put("a.parquet", Bytes::from_static(b"x")).await.unwrap();
    assert!(location.exists("region=us/a.parquet").await.unwrap());
}

#[tokio::test]
async fn test_missing_object_error_side() {
    let read = memory_location(Access::Read);
    let err = read.get("nope").await.unwrap_err();
    assert!(matches!(err, Error::SourceUnavailable { .. }), "{err:?}");

    let write = read.with_access(Access::Write);
    let err = write.get("nope").await.unwrap_err();
    assert!(matches!(err, Error::WriteTargetUnavailable { .. }), "{err:?}");
}

#[tokio::test]
async fn test_slow_store_calls_time_out() {
    let store = Arc::new(faulty::FaultyStore::new());
    let write = StorageLocation::from_store(store.clone(), "memory://slow/root", "root", Access::Write)
        .with_timeout(Duration::from_millis(100));
    write.put("a.json", Bytes::from_static(b"{}")).await.unwrap();

    store.delay_by(Duration::from_secs(5));

    let err = write.put("b.json", Bytes::from_static(b"{}")).await.unwrap_err();
    assert!(matches!(err, Error::WriteTargetUnavailable { .. }), "{err:?}");
    assert!(err.to_string().contains("put timed out"), "{err}");

    let read = write.with_access(Access::Read);
    let err = read.get("a.json").await.unwrap_err();
    assert!(matches!(err, Error::SourceUnavailable { .. }), "{err:?}");
    assert!(err.to_string().contains("get timed out"), "{err}");
}

#[tokio::test]
async fn test_memory_urls_share_a_store() {
    let writer = StorageLocation::parse("memory://storage-tests/data/", Access::Write).unwrap();
    writer.put("x.json", Bytes::from_static(b"{}")).await.unwrap();

    let reader = StorageLocation::parse("memory://storage-tests/data", Access::Read).unwrap();
    assert_eq!(reader.url(), "memory://storage-tests/data");
    assert!(reader.exists("x.json").await.unwrap());
}

#[tokio::test]
async fn test_local_location() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("out");
    let root_str = root.to_str().unwrap();

    let err = StorageLocation::parse(root_str, Access::Read).unwrap_err();
    assert!(matches!(err, Error::SourceUnavailable { .. }));

    let writer = StorageLocation::parse(root_str, Access::Write).unwrap();
    writer
        .put("region=us/part.parquet", Bytes::from_static(b"data"))
        .await
        .unwrap();
    assert!(root.join("region=us").join("part.parquet").exists());

    let reader = StorageLocation::parse(&format!("file://{root_str}"), Access::Read).unwrap();
    let entries = reader.list("").await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].path, "region=us/part.parquet");
}

#[test]
fn test_unsupported_scheme() {
    let err = StorageLocation::parse("ftp://host/path", Access::Write).unwrap_err();
    assert!(matches!(err, Error::WriteTargetUnavailable { .. }));
}
