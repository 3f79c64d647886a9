//! Pipeline driver tests

use super::*;
use crate::catalog::{Catalog, MemoryCatalog, TableEntry};
use crate::config::{BatchJobConfig, EventHandlerConfig, StorageConfig};
use crate::decode::{ParquetDecoder, RecordDecoder};
use crate::error::Error;
use crate::output::{committed_files, SUCCESS_MARKER};
use crate::storage::{Access, StorageLocation};
use crate::types::{ErrorPolicy, Record, WriteMode};
use bytes::Bytes;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;

const HEADER: &str = "video_id,trending_date,title,channel_title,category_id,publish_time,tags,\
views,likes,dislikes,comment_count,thumbnail_link,comments_disabled,ratings_disabled,\
video_error_or_removed,description\n";

fn csv_row(video_id: &str, category_id: &str) -> String {
    format!(
        "{video_id},17.14.11,\"Title, {video_id}\",Channel,{category_id},\
         2017-11-13T17:13:01.000Z,a|b,748374,57527,2966,15954,\
         https://i.ytimg.com/vi/{video_id}/default.jpg,False,False,False,\n"
    )
}

/// Write one CSV file per region under `<url>/region=<r>/`
async fn seed_source(url: &str, rows: &[(&str, &str, &str)]) {
    let root = StorageLocation::parse(url, Access::Write).unwrap();
    for (region, video_id, category_id) in rows {
        let body = format!("{HEADER}{}", csv_row(video_id, category_id));
        root.put(
            &format!("region={region}/{region}videos.csv"),
            Bytes::from(body),
        )
        .await
        .unwrap();
    }
}

async fn read_back(url: &str, dir: &str) -> Vec<Record> {
    let root = StorageLocation::parse(url, Access::Read).unwrap();
    let mut out = Vec::new();
    for file in committed_files(&root, dir).await.unwrap() {
        let body = root.get(&file).await.unwrap();
        out.extend(ParquetDecoder::new().decode(&file, &body).unwrap());
    }
    out
}

fn batch_config(base: &str) -> BatchJobConfig {
    let mut config = BatchJobConfig::new(
        format!("{base}/raw_statistics"),
        format!("{base}/cleansed/raw_statistics"),
    );
    config.source_partition_keys = vec!["region".to_string()];
    config.predicate = Some("region in ('ca','gb','us')".to_string());
    config
}

// ============================================================================
// Batch Job Tests
// ============================================================================

#[tokio::test]
async fn test_batch_job_end_to_end() {
    let base = "memory://pipeline-batch-e2e";
    seed_source(
        &format!("{base}/raw_statistics"),
        &[("us", "v1", "24"), ("de", "v2", "10")],
    )
    .await;

    let job = BatchJob::new(&batch_config(base), &StorageConfig::default()).unwrap();
    let report = job.run().await.unwrap();

    assert_eq!(report.rows_extracted, 1);
    assert_eq!(report.partitions_pruned, 1);
    assert_eq!(report.rows_rejected, 0);
    assert_eq!(report.write.rows_written, 1);
    assert_eq!(report.write.paths.len(), 1);

    let target = format!("{base}/cleansed/raw_statistics");
    let us = read_back(&target, "region=us").await;
    assert_eq!(us.len(), 1);
    assert_eq!(us[0]["video_id"], json!("v1"));
    assert_eq!(us[0]["category_id"], json!(24));
    assert_eq!(us[0]["comments_disabled"], json!(false));
    assert!(!us[0].contains_key("region"));
    assert!(read_back(&target, "region=de").await.is_empty());

    let root = StorageLocation::parse(&target, Access::Read).unwrap();
    assert!(root.exists(SUCCESS_MARKER).await.unwrap());
}

#[tokio::test]
async fn test_batch_job_catalog_source() {
    let base = "memory://pipeline-batch-catalog";
    seed_source(
        &format!("{base}/raw_statistics"),
        &[("ca", "v1", "1"), ("in", "v2", "2"), ("gb", "v3", "3")],
    )
    .await;

    let catalog = Arc::new(MemoryCatalog::new());
    catalog
        .upsert_table(
            TableEntry::new(
                "db_youtube_raw",
                "raw_statistics",
                format!("{base}/raw_statistics"),
            )
            .with_format("csv")
            .with_partition_keys(vec!["region".to_string()]),
        )
        .await
        .unwrap();

    let mut config = batch_config(base);
    config.source = "db_youtube_raw.raw_statistics".to_string();
    config.source_partition_keys.clear();

    let report = BatchJob::new(&config, &StorageConfig::default())
        .unwrap()
        .with_catalog(catalog)
        .run()
        .await
        .unwrap();
    assert_eq!(report.rows_extracted, 2);
    assert_eq!(report.write.partitions_values.len(), 2);
}

#[tokio::test]
async fn test_batch_job_coercion_failure_writes_nothing() {
    let base = "memory://pipeline-batch-coercion";
    seed_source(
        &format!("{base}/raw_statistics"),
        &[("us", "v1", "24"), ("gb", "v2", "not-a-number")],
    )
    .await;

    let err = BatchJob::new(&batch_config(base), &StorageConfig::default())
        .unwrap()
        .run()
        .await
        .unwrap_err();
    assert!(
        matches!(err, Error::TypeCoercion { ref field, .. } if field == "category_id"),
        "{err:?}"
    );

    let target = StorageLocation::parse(&format!("{base}/cleansed"), Access::Write).unwrap();
    assert!(target.list("").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_batch_job_skip_policy() {
    let base = "memory://pipeline-batch-skip";
    seed_source(
        &format!("{base}/raw_statistics"),
        &[("us", "v1", "24"), ("gb", "v2", "not-a-number")],
    )
    .await;

    let mut config = batch_config(base);
    config.on_error = ErrorPolicy::SkipRecord;
    let report = BatchJob::new(&config, &StorageConfig::default())
        .unwrap()
        .run()
        .await
        .unwrap();
    assert_eq!(report.rows_rejected, 1);
    assert_eq!(report.write.rows_written, 1);
}

#[tokio::test]
async fn test_batch_job_overwrite_replaces_partition() {
    let base = "memory://pipeline-batch-overwrite";
    let source = format!("{base}/raw_statistics");
    seed_source(&source, &[("us", "v1", "24")]).await;

    let mut config = batch_config(base);
    config.write_mode = WriteMode::Overwrite;
    let job = BatchJob::new(&config, &StorageConfig::default()).unwrap();
    job.run().await.unwrap();

    seed_source(&source, &[("us", "v9", "24")]).await;
    job.run().await.unwrap();

    let us = read_back(&format!("{base}/cleansed/raw_statistics"), "region=us").await;
    assert_eq!(us.len(), 1);
    assert_eq!(us[0]["video_id"], json!("v9"));
}

#[test]
fn test_batch_job_rejects_bad_config() {
    let mut config = batch_config("memory://pipeline-batch-bad");
    config.mapping = "no_such_mapping".to_string();
    assert!(matches!(
        BatchJob::new(&config, &StorageConfig::default()).unwrap_err(),
        Error::Config { .. }
    ));
}

// ============================================================================
// Object Event Tests
// ============================================================================

#[test]
fn test_object_event_direct() {
    let event = ObjectEvent::from_json(&json!({"bucket": "raw", "key": "a/b.json"})).unwrap();
    assert_eq!(event, ObjectEvent::new("raw", "a/b.json"));
    assert_eq!(event.url(), "s3://raw/a/b.json");
}

#[test]
fn test_object_event_direct_key_is_taken_verbatim() {
    let event =
        ObjectEvent::from_json(&json!({"bucket": "raw", "key": "a+b%2B.json"})).unwrap();
    assert_eq!(event.key, "a+b%2B.json");
}

#[test]
fn test_object_event_notification() {
    let payload = json!({
        "Records": [{
            "eventName": "ObjectCreated:Put",
            "s3": {
                "bucket": {"name": "de-on-youtube-raw"},
                "object": {"key": "youtube/raw_statistics_reference_data/US+category%5Fid.json", "size": 8000}
            }
        }]
    });
    let event = ObjectEvent::from_json(&payload).unwrap();
    assert_eq!(event.bucket, "de-on-youtube-raw");
    assert_eq!(
        event.key,
        "youtube/raw_statistics_reference_data/US category_id.json"
    );
}

#[test]
fn test_object_event_rejects_malformed() {
    assert!(ObjectEvent::from_json(&json!({"Records": []})).is_err());
    assert!(ObjectEvent::from_json(&json!({"bucket": "b"})).is_err());
    assert!(ObjectEvent::from_json(&json!({"bucket": "", "key": "k"})).is_err());
}

#[test]
fn test_decode_object_key() {
    assert_eq!(decode_object_key("region%3Dus/a+b.json"), "region=us/a b.json");
    assert_eq!(decode_object_key("region=us/x&y.json"), "region=us/x&y.json");
    assert_eq!(decode_object_key("caf%C3%A9.json"), "café.json");
}

// ============================================================================
// Event Handler Tests
// ============================================================================

fn reference_document() -> serde_json::Value {
    json!({
        "kind": "youtube#videoCategoryListResponse",
        "items": [
            {"kind": "youtube#videoCategory", "id": "1",
             "snippet": {"channelId": "UCBR8", "title": "Film & Animation", "assignable": true}},
            {"kind": "youtube#videoCategory", "id": "2",
             "snippet": {"channelId": "UCBR8", "title": "Autos & Vehicles", "assignable": true}}
        ]
    })
}

async fn raw_bucket(url: &str, key: &str, body: &serde_json::Value) -> StorageLocation {
    let raw = StorageLocation::parse(url, Access::Write).unwrap();
    raw.put(key, Bytes::from(body.to_string())).await.unwrap();
    raw
}

#[tokio::test]
async fn test_event_handler_writes_and_registers() {
    let raw = raw_bucket(
        "memory://pipeline-event-raw",
        "youtube/US category_id.json",
        &reference_document(),
    )
    .await;
    let catalog = Arc::new(MemoryCatalog::new());
    let config = EventHandlerConfig::new(
        "memory://pipeline-event-cleansed/reference",
        "db_youtube_cleaned",
        "cleaned_statistics_reference_data",
    );

    let handler = EventHandler::new(&config, catalog.clone(), &StorageConfig::default())
        .unwrap()
        .with_source(raw);

    let result = handler
        .handle_json(&json!({"bucket": "raw", "key": "youtube/US category_id.json"}))
        .await
        .unwrap();
    assert_eq!(result.rows_written, 2);
    assert!(result.catalog.as_ref().unwrap().registered);

    let entry = catalog
        .get_table("db_youtube_cleaned", "cleaned_statistics_reference_data")
        .await
        .unwrap()
        .unwrap();
    let columns: Vec<&str> = entry.columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(
        columns,
        vec![
            "kind",
            "id",
            "snippet.channelId",
            "snippet.title",
            "snippet.assignable"
        ]
    );

    let rows = read_back("memory://pipeline-event-cleansed/reference", "").await;
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["snippet.title"], json!("Film & Animation"));
}

#[tokio::test]
async fn test_event_handler_empty_items() {
    let raw = raw_bucket(
        "memory://pipeline-event-empty",
        "empty.json",
        &json!({"items": []}),
    )
    .await;
    let config = EventHandlerConfig::new("memory://pipeline-event-empty/out", "db", "t");
    let handler = EventHandler::new(&config, Arc::new(MemoryCatalog::new()), &StorageConfig::default())
        .unwrap()
        .with_source(raw);

    let result = handler
        .handle(&ObjectEvent::new("raw", "empty.json"))
        .await
        .unwrap();
    assert_eq!(result.rows_written, 0);
    assert!(result.paths.is_empty());
}

#[tokio::test]
async fn test_event_handler_propagates_errors() {
    let raw = raw_bucket(
        "memory://pipeline-event-errors",
        "no_items.json",
        &json!({"kind": "x"}),
    )
    .await;
    let config = EventHandlerConfig::new("memory://pipeline-event-errors/out", "db", "t");
    let handler = EventHandler::new(&config, Arc::new(MemoryCatalog::new()), &StorageConfig::default())
        .unwrap()
        .with_source(raw);

    let err = handler
        .handle(&ObjectEvent::new("raw", "no_items.json"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::SchemaMismatch { .. }), "{err:?}");
    assert!(err.to_string().contains("no_items.json"));

    let err = handler
        .handle(&ObjectEvent::new("raw", "missing.json"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::SourceUnavailable { .. }), "{err:?}");
}

#[test]
fn test_event_handler_rejects_bad_config() {
    let config = EventHandlerConfig::new("", "db", "t");
    let err = EventHandler::new(&config, Arc::new(MemoryCatalog::new()), &StorageConfig::default())
        .unwrap_err();
    assert!(matches!(err, Error::MissingConfigField { .. }));
}
