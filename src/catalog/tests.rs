//! Catalog tests

use super::*;
use crate::storage::{Access, StorageLocation};
use arrow::datatypes::{DataType, Field, Schema};
use object_store::memory::InMemory;
use std::collections::BTreeMap;
use std::sync::Arc;

fn sample_entry(table: &str) -> TableEntry {
    TableEntry::new("db_youtube_cleaned", table, "s3://cleansed/youtube/raw_statistics")
        .with_partition_keys(vec!["region".to_string()])
        .with_columns(vec![
            ColumnDef::new("video_id", "string"),
            ColumnDef::new("views", "bigint"),
        ])
}

#[test]
fn test_catalog_type_names() {
    assert_eq!(catalog_type(&DataType::Int64), "bigint");
    assert_eq!(catalog_type(&DataType::Int32), "int");
    assert_eq!(catalog_type(&DataType::Float32), "float");
    assert_eq!(catalog_type(&DataType::Utf8), "string");
    assert_eq!(
        catalog_type(&DataType::List(Arc::new(Field::new(
            "item",
            DataType::Utf8,
            true
        )))),
        "array<string>"
    );
}

#[test]
fn test_entry_from_schema() {
    let schema = Schema::new(vec![
        Field::new("id", DataType::Utf8, true),
        Field::new("snippet.assignable", DataType::Boolean, true),
    ]);
    let entry = TableEntry::new("db", "t", "memory://lake/t").with_schema(&schema);
    assert_eq!(
        entry.columns,
        vec![
            ColumnDef::new("id", "string"),
            ColumnDef::new("snippet.assignable", "boolean"),
        ]
    );
    assert_eq!(entry.format, "parquet");
}

#[test]
fn test_all_column_names_include_partition_keys() {
    let entry = sample_entry("raw_statistics");
    assert_eq!(entry.all_column_names(), vec!["video_id", "views", "region"]);
}

#[test]
fn test_add_partition_dedupes() {
    let mut entry = sample_entry("raw_statistics");
    let us: BTreeMap<String, String> = [("region".to_string(), "us".to_string())].into();
    entry.add_partition(us.clone());
    entry.add_partition(us);
    assert_eq!(entry.partition_values.len(), 1);
}

#[tokio::test]
async fn test_memory_catalog_upsert_and_get() {
    let catalog = MemoryCatalog::new();
    assert!(catalog.get_table("db_youtube_cleaned", "x").await.unwrap().is_none());

    catalog.upsert_table(sample_entry("b")).await.unwrap();
    catalog.upsert_table(sample_entry("a")).await.unwrap();

    let mut replaced = sample_entry("a");
    replaced.location = "s3://elsewhere".to_string();
    catalog.upsert_table(replaced).await.unwrap();

    let entry = catalog
        .get_table("db_youtube_cleaned", "a")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(entry.location, "s3://elsewhere");
    assert_eq!(
        catalog.list_tables("db_youtube_cleaned").await.unwrap(),
        vec!["a", "b"]
    );
    assert_eq!(catalog.len().await, 2);
}

#[tokio::test]
async fn test_memory_catalog_clones_share_state() {
    let catalog = MemoryCatalog::new();
    let other = catalog.clone();
    other.upsert_table(sample_entry("t")).await.unwrap();
    assert!(!catalog.is_empty().await);
}

#[tokio::test]
async fn test_file_catalog_round_trip() {
    let root = StorageLocation::from_store(
        Arc::new(InMemory::new()),
        "memory://catalog",
        "",
        Access::Write,
    );
    let catalog = FileCatalog::new(root.clone());

    let entry = sample_entry("raw_statistics");
    catalog.upsert_table(entry.clone()).await.unwrap();

    assert!(root
        .exists("db_youtube_cleaned/raw_statistics.json")
        .await
        .unwrap());
    let loaded = catalog
        .get_table("db_youtube_cleaned", "raw_statistics")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(loaded, entry);
    assert_eq!(
        catalog.list_tables("db_youtube_cleaned").await.unwrap(),
        vec!["raw_statistics"]
    );
    assert!(catalog.get_table("db_youtube_cleaned", "other").await.unwrap().is_none());
}

#[tokio::test]
async fn test_file_catalog_rejects_bad_names() {
    let catalog = FileCatalog::open("memory://catalog-names").unwrap();
    assert!(catalog.get_table("db", "../t").await.is_err());
    assert!(catalog.get_table("", "t").await.is_err());
}
