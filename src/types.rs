//! Common types used throughout the pipeline
//!
//! This module contains the row model and the small enums that are shared
//! by configuration, the mapper and the writer.

use arrow::datatypes::SchemaRef;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

// ============================================================================
// Type Aliases
// ============================================================================

/// JSON value type (re-exported from serde_json)
pub type JsonValue = serde_json::Value;

/// One row: an ordered mapping from field name to value
pub type Record = serde_json::Map<String, JsonValue>;

// ============================================================================
// Row Set
// ============================================================================

/// A collection of records sharing a schema
///
/// The schema is `None` while it is still implicit (straight out of
/// extraction or flattening) and explicit once the schema mapper has run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowSet {
    schema: Option<SchemaRef>,
    records: Vec<Record>,
}

impl RowSet {
    /// Create a row set with an implicit schema
    pub fn new(records: Vec<Record>) -> Self {
        Self {
            schema: None,
            records,
        }
    }

    /// Create a row set with an explicit schema
    pub fn with_schema(schema: SchemaRef, records: Vec<Record>) -> Self {
        Self {
            schema: Some(schema),
            records,
        }
    }

    /// An empty row set
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a row set from JSON objects, rejecting anything else
    pub fn from_values(values: Vec<JsonValue>) -> crate::Result<Self> {
        let mut records = Vec::with_capacity(values.len());
        for (idx, value) in values.into_iter().enumerate() {
            match value {
                JsonValue::Object(obj) => records.push(obj),
                other => {
                    return Err(crate::Error::schema_mismatch(format!(
                        "row {idx} is not an object: {other}"
                    )))
                }
            }
        }
        Ok(Self::new(records))
    }

    /// Explicit schema, if one has been established
    pub fn schema(&self) -> Option<&SchemaRef> {
        self.schema.as_ref()
    }

    /// Records in this row set
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Consume the row set, returning its records
    pub fn into_records(self) -> Vec<Record> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

// ============================================================================
// Write Mode
// ============================================================================

/// How data should be written to the target dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteMode {
    /// Add new files alongside existing data
    #[default]
    Append,
    /// Replace the data of every partition touched by the write
    #[serde(alias = "overwrite_partitions")]
    Overwrite,
}

impl FromStr for WriteMode {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "append" => Ok(WriteMode::Append),
            "overwrite" | "overwrite_partitions" => Ok(WriteMode::Overwrite),
            other => Err(crate::Error::invalid_config(
                "write_mode",
                format!("expected 'append' or 'overwrite', got '{other}'"),
            )),
        }
    }
}

impl std::fmt::Display for WriteMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WriteMode::Append => write!(f, "append"),
            WriteMode::Overwrite => write!(f, "overwrite"),
        }
    }
}

// ============================================================================
// Error Policy
// ============================================================================

/// What to do when a single record fails mapping or partitioning
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorPolicy {
    /// Fail the whole batch on the first bad record
    #[default]
    AbortBatch,
    /// Drop the bad record, log it and continue
    SkipRecord,
}

// ============================================================================
// Compression
// ============================================================================

/// Parquet compression codec, explicit per write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionCodec {
    /// No compression
    #[serde(alias = "uncompressed")]
    None,
    #[default]
    Snappy,
    Gzip,
    Zstd,
}

impl std::fmt::Display for CompressionCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompressionCodec::None => write!(f, "none"),
            CompressionCodec::Snappy => write!(f, "snappy"),
            CompressionCodec::Gzip => write!(f, "gzip"),
            CompressionCodec::Zstd => write!(f, "zstd"),
        }
    }
}
