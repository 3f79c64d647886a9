//! Catalog entry types

use crate::error::Result;
use crate::types::CompressionCodec;
use arrow::datatypes::{DataType, Schema};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One column of a catalogued table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    /// Query-engine type name (`bigint`, `string`, `array<string>`, ...)
    #[serde(rename = "type")]
    pub data_type: String,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
        }
    }
}

/// A (database, table) entry pointing at a dataset location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableEntry {
    pub database: String,
    pub table: String,
    /// Dataset root URL
    pub location: String,
    /// Storage format of the data files
    #[serde(default = "default_format")]
    pub format: String,
    #[serde(default)]
    pub compression: CompressionCodec,
    #[serde(default)]
    pub partition_keys: Vec<String>,
    /// Data columns, excluding partition keys
    #[serde(default)]
    pub columns: Vec<ColumnDef>,
    /// Known partitions, one map of key to value per partition
    #[serde(default)]
    pub partition_values: Vec<BTreeMap<String, String>>,
    pub updated_at: DateTime<Utc>,
}

fn default_format() -> String {
    "parquet".to_string()
}

impl TableEntry {
    /// Create an entry with no columns or partitions
    pub fn new(
        database: impl Into<String>,
        table: impl Into<String>,
        location: impl Into<String>,
    ) -> Self {
        Self {
            database: database.into(),
            table: table.into(),
            location: location.into(),
            format: default_format(),
            compression: CompressionCodec::default(),
            partition_keys: Vec::new(),
            columns: Vec::new(),
            partition_values: Vec::new(),
            updated_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = format.into();
        self
    }

    #[must_use]
    pub fn with_partition_keys(mut self, keys: Vec<String>) -> Self {
        self.partition_keys = keys;
        self
    }

    #[must_use]
    pub fn with_columns(mut self, columns: Vec<ColumnDef>) -> Self {
        self.columns = columns;
        self
    }

    /// Columns taken from an Arrow schema
    #[must_use]
    pub fn with_schema(self, schema: &Schema) -> Self {
        let columns = schema
            .fields()
            .iter()
            .map(|f| ColumnDef::new(f.name(), catalog_type(f.data_type())))
            .collect();
        self.with_columns(columns)
    }

    /// `database.table`
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.database, self.table)
    }

    /// Every column name a query against this table may reference
    pub fn all_column_names(&self) -> Vec<&str> {
        self.columns
            .iter()
            .map(|c| c.name.as_str())
            .chain(self.partition_keys.iter().map(String::as_str))
            .collect()
    }

    /// Record a partition if it is not already known
    pub fn add_partition(&mut self, values: BTreeMap<String, String>) {
        if !self.partition_values.contains(&values) {
            self.partition_values.push(values);
        }
    }
}

/// Query-engine type name for an Arrow type
pub fn catalog_type(data_type: &DataType) -> String {
    match data_type {
        DataType::Boolean => "boolean".to_string(),
        DataType::Int8 => "tinyint".to_string(),
        DataType::Int16 => "smallint".to_string(),
        DataType::Int32 => "int".to_string(),
        DataType::Int64 => "bigint".to_string(),
        DataType::Float32 => "float".to_string(),
        DataType::Float64 => "double".to_string(),
        DataType::List(item) => format!("array<{}>", catalog_type(item.data_type())),
        DataType::Struct(fields) => {
            let inner: Vec<String> = fields
                .iter()
                .map(|f| format!("{}:{}", f.name(), catalog_type(f.data_type())))
                .collect();
            format!("struct<{}>", inner.join(","))
        }
        _ => "string".to_string(),
    }
}

/// Table metadata store consulted by query engines
///
/// Entries are keyed by (database, table). `upsert_table` replaces the
/// whole entry.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Look up a table; `None` when it is not registered
    async fn get_table(&self, database: &str, table: &str) -> Result<Option<TableEntry>>;

    /// Create or replace a table entry
    async fn upsert_table(&self, entry: TableEntry) -> Result<()>;

    /// Names of the tables in a database
    async fn list_tables(&self, database: &str) -> Result<Vec<String>>;
}
