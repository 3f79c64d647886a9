//! Output module
//!
//! Handles Arrow RecordBatch creation and partitioned Parquet writing.
//!
//! # Overview
//!
//! This module provides utilities for:
//! - Inferring Arrow schemas from records
//! - Converting between records and Arrow RecordBatches
//! - Encoding Parquet files
//! - Writing Hive-partitioned datasets with manifest commits and catalog
//!   registration

mod manifest;
mod partitioned;
mod schema;
mod types;
mod writer;

pub use manifest::{
    committed_files, read_manifest, PartitionManifest, MANIFEST_FILE, SUCCESS_MARKER,
};
pub use partitioned::PartitionedWriter;
pub use schema::{batch_to_records, infer_schema, records_to_batch};
pub use types::{
    CatalogOutcome, CatalogTarget, WriteOptions, WriteResult, DEFAULT_MAX_ROWS_PER_FILE,
};
pub use writer::{write_parquet_bytes, ParquetWriter, ParquetWriterConfig};
