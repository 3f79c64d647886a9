//! Write options and result descriptor

use crate::error::{Error, Result};
use crate::types::{CompressionCodec, ErrorPolicy, WriteMode};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Default shard size when partitions are not coalesced
pub const DEFAULT_MAX_ROWS_PER_FILE: usize = 100_000;

/// Catalog entry to create or update after a write
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogTarget {
    pub database: String,
    pub table: String,
}

impl CatalogTarget {
    pub fn new(database: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            table: table.into(),
        }
    }
}

/// Parameters of one write call
#[derive(Debug, Clone, PartialEq)]
pub struct WriteOptions {
    /// Columns whose values name the partition directories
    pub partition_keys: Vec<String>,
    pub mode: WriteMode,
    pub compression: CompressionCodec,
    /// Write exactly one file per partition
    pub coalesce: bool,
    /// Shard size when not coalescing
    pub max_rows_per_file: usize,
    /// What to do with records lacking a partition value
    pub on_missing_partition_key: ErrorPolicy,
    pub catalog: Option<CatalogTarget>,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            partition_keys: Vec::new(),
            mode: WriteMode::default(),
            compression: CompressionCodec::default(),
            coalesce: false,
            max_rows_per_file: DEFAULT_MAX_ROWS_PER_FILE,
            on_missing_partition_key: ErrorPolicy::default(),
            catalog: None,
        }
    }
}

impl WriteOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_partition_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.partition_keys = keys.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_mode(mut self, mode: WriteMode) -> Self {
        self.mode = mode;
        self
    }

    #[must_use]
    pub fn with_compression(mut self, compression: CompressionCodec) -> Self {
        self.compression = compression;
        self
    }

    #[must_use]
    pub fn coalesced(mut self) -> Self {
        self.coalesce = true;
        self
    }

    #[must_use]
    pub fn with_max_rows_per_file(mut self, rows: usize) -> Self {
        self.max_rows_per_file = rows;
        self
    }

    #[must_use]
    pub fn with_missing_key_policy(mut self, policy: ErrorPolicy) -> Self {
        self.on_missing_partition_key = policy;
        self
    }

    #[must_use]
    pub fn with_catalog(mut self, database: impl Into<String>, table: impl Into<String>) -> Self {
        self.catalog = Some(CatalogTarget::new(database, table));
        self
    }

    /// Check the options before any I/O
    pub fn validate(&self) -> Result<()> {
        for (idx, key) in self.partition_keys.iter().enumerate() {
            if key.is_empty() {
                return Err(Error::invalid_config(
                    "partition_keys",
                    "partition key names must not be empty",
                ));
            }
            if self.partition_keys[..idx].contains(key) {
                return Err(Error::invalid_config(
                    "partition_keys",
                    format!("duplicate partition key '{key}'"),
                ));
            }
        }
        if self.max_rows_per_file == 0 {
            return Err(Error::invalid_config(
                "max_rows_per_file",
                "must be greater than zero",
            ));
        }
        if let Some(target) = &self.catalog {
            if target.database.is_empty() || target.table.is_empty() {
                return Err(Error::invalid_config(
                    "catalog",
                    "database and table must both be set",
                ));
            }
        }
        Ok(())
    }
}

/// Outcome of catalog registration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogOutcome {
    pub database: String,
    pub table: String,
    pub registered: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Result descriptor returned by a write
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteResult {
    /// Full URLs of the data files written
    pub paths: Vec<String>,
    /// Partition directory URL to its partition values, in key order
    pub partitions_values: BTreeMap<String, Vec<String>>,
    pub rows_written: usize,
    /// Records dropped under the skip policy
    pub rows_skipped: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub catalog: Option<CatalogOutcome>,
}

impl WriteResult {
    /// Whether the catalog step was requested and failed
    pub fn catalog_failed(&self) -> bool {
        self.catalog.as_ref().is_some_and(|c| !c.registered)
    }
}
