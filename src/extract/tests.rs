//! Extractor tests

use super::*;
use crate::catalog::{Catalog, ColumnDef, MemoryCatalog, TableEntry};
use crate::error::Error;
use crate::predicate::parse_predicate;
use crate::storage::{Access, StorageLocation};
use bytes::Bytes;
use serde_json::json;
use std::sync::Arc;

const HEADER: &str = "video_id,title,views\n";

/// Seed a CSV dataset partitioned by region under a memory URL
async fn seed(url: &str, regions: &[&str]) {
    let root = StorageLocation::parse(url, Access::Write).unwrap();
    for (i, region) in regions.iter().enumerate() {
        let body = format!("{HEADER}v{i},\"Title, {region}\",{}\n", (i + 1) * 100);
        root.put(
            &format!("region={region}/{region}videos.csv"),
            Bytes::from(body),
        )
        .await
        .unwrap();
    }
    root.put("_SUCCESS", Bytes::new()).await.unwrap();
}

fn regions_of(rows: &crate::types::RowSet) -> Vec<String> {
    let mut regions: Vec<String> = rows
        .records()
        .iter()
        .map(|r| r["region"].as_str().unwrap().to_string())
        .collect();
    regions.sort();
    regions
}

// ============================================================================
// DatasetRef Tests
// ============================================================================

#[test]
fn test_dataset_ref_parse() {
    assert_eq!(
        DatasetRef::parse("db_youtube_raw.raw_statistics").unwrap(),
        DatasetRef::table("db_youtube_raw", "raw_statistics")
    );
    assert!(matches!(
        DatasetRef::parse("s3://bucket/youtube/raw_statistics/").unwrap(),
        DatasetRef::Path { .. }
    ));
    assert!(matches!(
        DatasetRef::parse("no_dot").unwrap_err(),
        Error::SourceUnavailable { .. }
    ));
    assert!(DatasetRef::parse("a.b.c").is_err());
}

#[test]
fn test_dataset_ref_display() {
    assert_eq!(DatasetRef::table("db", "t").to_string(), "db.t");
    assert_eq!(
        DatasetRef::path("memory://x/y", ["region"]).to_string(),
        "memory://x/y"
    );
}

// ============================================================================
// Scan Tests
// ============================================================================

#[tokio::test]
async fn test_region_in_list_prunes_partitions() {
    let url = "memory://extract-prune/raw_statistics";
    seed(url, &["ca", "de", "gb", "in", "us"]).await;

    let predicate = parse_predicate("region in ('ca','gb','us')").unwrap();
    let (rows, stats) = Extractor::new()
        .extract_with_stats(&DatasetRef::path(url, ["region"]), Some(&predicate))
        .await
        .unwrap();

    assert_eq!(regions_of(&rows), vec!["ca", "gb", "us"]);
    assert_eq!(stats.partitions_read, 3);
    assert_eq!(stats.partitions_pruned, 2);
    assert_eq!(stats.files_read, 3);
}

#[tokio::test]
async fn test_full_scan_matches_pushdown() {
    let url = "memory://extract-fullscan/raw_statistics";
    seed(url, &["ca", "de", "gb", "in", "us"]).await;
    let dataset = DatasetRef::path(url, ["region"]);
    let predicate = parse_predicate("region in ('ca','gb','us')").unwrap();

    let (pushed, _) = Extractor::new()
        .extract_with_stats(&dataset, Some(&predicate))
        .await
        .unwrap();
    let (scanned, stats) = Extractor::new()
        .without_pushdown()
        .extract_with_stats(&dataset, Some(&predicate))
        .await
        .unwrap();

    assert_eq!(regions_of(&pushed), regions_of(&scanned));
    assert_eq!(stats.partitions_pruned, 0);
    assert_eq!(stats.partitions_read, 5);
    assert_eq!(stats.rows_scanned, 5);
}

#[tokio::test]
async fn test_local_predicate_and_partition_injection() {
    let url = "memory://extract-local/raw_statistics";
    seed(url, &["ca", "us"]).await;

    let predicate = parse_predicate("region = 'us' or views = '100'").unwrap();
    let rows = Extractor::new()
        .extract(&DatasetRef::path(url, ["region"]), Some(&predicate))
        .await
        .unwrap();

    assert_eq!(rows.len(), 2);
    let us = rows
        .records()
        .iter()
        .find(|r| r["region"] == json!("us"))
        .unwrap();
    assert_eq!(us["title"], json!("Title, us"));
    assert_eq!(us["views"], json!("200"));
}

#[tokio::test]
async fn test_no_predicate_reads_everything_but_hidden_files() {
    let url = "memory://extract-all/raw_statistics";
    seed(url, &["ca", "us"]).await;

    let rows = Extractor::new()
        .extract(&DatasetRef::path(url, ["region"]), None)
        .await
        .unwrap();
    assert_eq!(rows.len(), 2);
}

#[tokio::test]
async fn test_manifest_limits_files_read() {
    let url = "memory://extract-manifest/ds";
    let root = StorageLocation::parse(url, Access::Write).unwrap();
    root.put("region=us/old.jsonl", Bytes::from_static(b"{\"id\":\"old\"}\n"))
        .await
        .unwrap();
    root.put("region=us/new.jsonl", Bytes::from_static(b"{\"id\":\"new\"}\n"))
        .await
        .unwrap();
    let manifest = json!({
        "version": 1,
        "write_id": "w",
        "files": ["new.jsonl"],
        "committed_at": "2024-01-01T00:00:00Z"
    });
    root.put(
        "region=us/_manifest.json",
        Bytes::from(manifest.to_string()),
    )
    .await
    .unwrap();

    let rows = Extractor::new()
        .extract(&DatasetRef::path(url, ["region"]), None)
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows.records()[0]["id"], json!("new"));
}

#[tokio::test]
async fn test_unknown_predicate_field_on_path_dataset() {
    let url = "memory://extract-unknown-path/raw_statistics";
    seed(url, &["us"]).await;

    let predicate = parse_predicate("country in ('us')").unwrap();
    let err = Extractor::new()
        .extract(&DatasetRef::path(url, ["region"]), Some(&predicate))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidPredicate { .. }), "{err:?}");
}

#[tokio::test]
async fn test_unknown_field_rejected_when_every_partition_is_pruned() {
    let url = "memory://extract-unknown-pruned/raw_statistics";
    seed(url, &["ca", "us"]).await;
    let dataset = DatasetRef::path(url, ["region"]);
    let predicate = parse_predicate("region in ('zz') and bogus = 1").unwrap();

    let pushed = Extractor::new()
        .extract(&dataset, Some(&predicate))
        .await
        .unwrap_err();
    let scanned = Extractor::new()
        .without_pushdown()
        .extract(&dataset, Some(&predicate))
        .await
        .unwrap_err();
    assert!(matches!(pushed, Error::InvalidPredicate { .. }), "{pushed:?}");
    assert!(matches!(scanned, Error::InvalidPredicate { .. }), "{scanned:?}");

    // Known fields on a fully pruned scan still give an empty result
    let predicate = parse_predicate("region in ('zz') and views > 1").unwrap();
    let rows = Extractor::new()
        .extract(&dataset, Some(&predicate))
        .await
        .unwrap();
    assert!(rows.is_empty());
}

// ============================================================================
// Catalog Resolution Tests
// ============================================================================

#[tokio::test]
async fn test_catalog_table_resolution() {
    let url = "memory://extract-catalog/raw_statistics";
    seed(url, &["ca", "de", "us"]).await;

    let catalog = Arc::new(MemoryCatalog::new());
    catalog
        .upsert_table(
            TableEntry::new("db_youtube_raw", "raw_statistics", url)
                .with_format("csv")
                .with_partition_keys(vec!["region".to_string()])
                .with_columns(vec![
                    ColumnDef::new("video_id", "string"),
                    ColumnDef::new("title", "string"),
                    ColumnDef::new("views", "bigint"),
                ]),
        )
        .await
        .unwrap();

    let extractor = Extractor::new().with_catalog(catalog);
    let dataset = DatasetRef::table("db_youtube_raw", "raw_statistics");

    let predicate = parse_predicate("region in ('ca','gb','us')").unwrap();
    let rows = extractor.extract(&dataset, Some(&predicate)).await.unwrap();
    assert_eq!(regions_of(&rows), vec!["ca", "us"]);

    let predicate = parse_predicate("country = 'us'").unwrap();
    let err = extractor.extract(&dataset, Some(&predicate)).await.unwrap_err();
    assert!(matches!(err, Error::InvalidPredicate { .. }), "{err:?}");
}

#[tokio::test]
async fn test_unresolvable_dataset() {
    let err = Extractor::new()
        .extract(&DatasetRef::table("db", "t"), None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::SourceUnavailable { .. }));

    let err = Extractor::new()
        .with_catalog(Arc::new(MemoryCatalog::new()))
        .extract(&DatasetRef::table("db", "missing"), None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::SourceUnavailable { .. }));

    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope");
    let err = Extractor::new()
        .extract(
            &DatasetRef::path(missing.to_str().unwrap(), ["region"]),
            None,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::SourceUnavailable { .. }));
}
