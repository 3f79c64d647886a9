//! Pipeline configuration
//!
//! A pipeline file is YAML with one section per entry point plus the shared
//! storage and catalog settings:
//!
//! ```yaml
//! batch:
//!   job_name: youtube-raw-statistics
//!   source: db_youtube_raw.raw_statistics
//!   predicate: "region in ('ca','gb','us')"
//!   mapping: raw_statistics
//!   target_path: s3://cleansed/youtube/raw_statistics/
//!   partition_key: region
//! event:
//!   target_path: s3://cleansed/youtube/raw_statistics_reference_data/
//!   catalog_database: db_youtube_cleaned
//!   catalog_table: cleaned_statistics_reference_data
//!   write_mode: append
//! storage:
//!   timeout_secs: 30
//! catalog:
//!   type: file
//!   root: s3://catalog/
//! ```
//!
//! The event section can also be built from the process environment with
//! [`EventHandlerConfig::from_env`]. Every section is validated before any
//! I/O happens.

use crate::catalog::{Catalog, FileCatalog, MemoryCatalog};
use crate::decode::DecoderFormat;
use crate::error::{Error, Result};
use crate::extract::DatasetRef;
use crate::mapping::{load_mapping, MappingTable};
use crate::output::WriteOptions;
use crate::predicate::{parse_predicate, Predicate};
use crate::types::{CompressionCodec, ErrorPolicy, WriteMode};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// Top-Level Pipeline Config
// ============================================================================

/// Complete pipeline configuration loaded from YAML
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Batch reshaping job
    #[serde(default)]
    pub batch: Option<BatchJobConfig>,

    /// Per-object event handler
    #[serde(default)]
    pub event: Option<EventHandlerConfig>,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub catalog: CatalogConfig,
}

impl PipelineConfig {
    /// Parse a pipeline file from a YAML string
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a pipeline file from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!(
                "Failed to read pipeline config '{}': {e}",
                path.display()
            ))
        })?;
        Self::from_yaml_str(&content)
    }

    /// Validate every section that is present
    pub fn validate(&self) -> Result<()> {
        if let Some(batch) = &self.batch {
            batch.validate()?;
        }
        if let Some(event) = &self.event {
            event.validate()?;
        }
        self.storage.validate()?;
        self.catalog.validate()
    }

    /// The batch section, or a config error naming it
    pub fn batch(&self) -> Result<&BatchJobConfig> {
        self.batch
            .as_ref()
            .ok_or_else(|| Error::missing_config_field("batch"))
    }

    /// The event section, or a config error naming it
    pub fn event(&self) -> Result<&EventHandlerConfig> {
        self.event
            .as_ref()
            .ok_or_else(|| Error::missing_config_field("event"))
    }
}

// ============================================================================
// Batch Job
// ============================================================================

/// Settings of the batch reshaping job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchJobConfig {
    /// Name used in logs
    #[serde(default = "default_job_name")]
    pub job_name: String,

    /// `database.table` resolved through the catalog, or a dataset URL
    pub source: String,

    /// Partition keys of a URL source (catalog tables declare their own)
    #[serde(default)]
    pub source_partition_keys: Vec<String>,

    /// File format of a URL source; inferred from file extensions when unset
    #[serde(default)]
    pub source_format: Option<DecoderFormat>,

    /// Filter over source attributes, e.g. `region in ('ca','gb','us')`
    #[serde(default)]
    pub predicate: Option<String>,

    /// Built-in mapping table name or path to a YAML file
    #[serde(default = "default_mapping")]
    pub mapping: String,

    /// Root URL of the output dataset
    pub target_path: String,

    /// Output partition column
    #[serde(default = "default_partition_key")]
    pub partition_key: String,

    #[serde(default)]
    pub write_mode: WriteMode,

    #[serde(default)]
    pub compression: CompressionCodec,

    /// What to do with records that fail coercion or lack a partition value
    #[serde(default)]
    pub on_error: ErrorPolicy,
}

fn default_job_name() -> String {
    "cleanse-batch".to_string()
}

fn default_mapping() -> String {
    "raw_statistics".to_string()
}

fn default_partition_key() -> String {
    "region".to_string()
}

impl BatchJobConfig {
    /// Minimal job reading `source` and writing to `target_path`
    pub fn new(source: impl Into<String>, target_path: impl Into<String>) -> Self {
        Self {
            job_name: default_job_name(),
            source: source.into(),
            source_partition_keys: Vec::new(),
            source_format: None,
            predicate: None,
            mapping: default_mapping(),
            target_path: target_path.into(),
            partition_key: default_partition_key(),
            write_mode: WriteMode::default(),
            compression: CompressionCodec::default(),
            on_error: ErrorPolicy::default(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.source.trim().is_empty() {
            return Err(Error::missing_config_field("batch.source"));
        }
        if self.target_path.trim().is_empty() {
            return Err(Error::missing_config_field("batch.target_path"));
        }
        if self.partition_key.trim().is_empty() {
            return Err(Error::invalid_config(
                "batch.partition_key",
                "must not be empty",
            ));
        }
        if self.mapping.trim().is_empty() {
            return Err(Error::missing_config_field("batch.mapping"));
        }
        self.dataset()?;
        self.parsed_predicate()?;
        Ok(())
    }

    /// The source as a dataset reference
    pub fn dataset(&self) -> Result<DatasetRef> {
        Ok(match DatasetRef::parse(&self.source)? {
            DatasetRef::Path { url, format, .. } => DatasetRef::Path {
                url,
                partition_keys: self.source_partition_keys.clone(),
                format: self.source_format.or(format),
            },
            table => table,
        })
    }

    /// The configured predicate, parsed
    pub fn parsed_predicate(&self) -> Result<Option<Predicate>> {
        match self.predicate.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(text) => parse_predicate(text).map(Some),
        }
    }

    /// Load the configured mapping table
    pub fn mapping_table(&self) -> Result<MappingTable> {
        load_mapping(&self.mapping)
    }

    /// Writer options: one coalesced file per partition
    pub fn write_options(&self) -> WriteOptions {
        WriteOptions::new()
            .with_partition_keys([self.partition_key.clone()])
            .with_mode(self.write_mode)
            .with_compression(self.compression)
            .with_missing_key_policy(self.on_error)
            .coalesced()
    }
}

// ============================================================================
// Event Handler
// ============================================================================

/// Environment variables read by [`EventHandlerConfig::from_env`]
///
/// Each setting accepts an upper-case name and the lower-case name used by
/// existing function deployments.
pub mod env {
    pub const TARGET_PATH: [&str; 2] = ["CLEANSED_LAYER_PATH", "s3_cleansed_layer"];
    pub const CATALOG_DATABASE: [&str; 2] = ["CATALOG_DB_NAME", "glue_catalog_db_name"];
    pub const CATALOG_TABLE: [&str; 2] = ["CATALOG_TABLE_NAME", "glue_catalog_table_name"];
    pub const WRITE_MODE: [&str; 2] = ["WRITE_DATA_OPERATION", "write_data_operation"];
}

/// Settings of the per-object event handler
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventHandlerConfig {
    /// Root URL of the output dataset
    pub target_path: String,

    pub catalog_database: String,

    pub catalog_table: String,

    #[serde(default)]
    pub write_mode: WriteMode,

    #[serde(default)]
    pub compression: CompressionCodec,

    /// Output partition columns; the handler writes unpartitioned by default
    #[serde(default)]
    pub partition_keys: Vec<String>,

    /// Top-level array holding the records of an event object
    #[serde(default = "default_items_field")]
    pub items_field: String,

    /// Separator used when promoting nested object keys
    #[serde(default = "default_separator")]
    pub separator: String,
}

fn default_items_field() -> String {
    crate::flatten::DEFAULT_ITEMS_FIELD.to_string()
}

fn default_separator() -> String {
    crate::flatten::DEFAULT_SEPARATOR.to_string()
}

impl EventHandlerConfig {
    pub fn new(
        target_path: impl Into<String>,
        catalog_database: impl Into<String>,
        catalog_table: impl Into<String>,
    ) -> Self {
        Self {
            target_path: target_path.into(),
            catalog_database: catalog_database.into(),
            catalog_table: catalog_table.into(),
            write_mode: WriteMode::default(),
            compression: CompressionCodec::default(),
            partition_keys: Vec::new(),
            items_field: default_items_field(),
            separator: default_separator(),
        }
    }

    #[must_use]
    pub fn with_write_mode(mut self, mode: WriteMode) -> Self {
        self.write_mode = mode;
        self
    }

    /// Build the config from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the config from any variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |names: [&str; 2]| -> Result<String> {
            names
                .iter()
                .find_map(|name| lookup(name).filter(|v| !v.trim().is_empty()))
                .ok_or_else(|| Error::missing_config_field(names[0]))
        };

        let config = Self::new(
            get(env::TARGET_PATH)?,
            get(env::CATALOG_DATABASE)?,
            get(env::CATALOG_TABLE)?,
        )
        .with_write_mode(get(env::WRITE_MODE)?.parse()?);

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let required = [
            ("event.target_path", &self.target_path),
            ("event.catalog_database", &self.catalog_database),
            ("event.catalog_table", &self.catalog_table),
            ("event.items_field", &self.items_field),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(Error::missing_config_field(field));
            }
        }
        self.write_options().validate()
    }

    /// Writer options: shard files, register in the catalog
    pub fn write_options(&self) -> WriteOptions {
        WriteOptions::new()
            .with_partition_keys(self.partition_keys.clone())
            .with_mode(self.write_mode)
            .with_compression(self.compression)
            .with_catalog(&self.catalog_database, &self.catalog_table)
    }
}

// ============================================================================
// Storage
// ============================================================================

/// Settings shared by every object store call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Per-call timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl StorageConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn validate(&self) -> Result<()> {
        if self.timeout_secs == 0 {
            return Err(Error::invalid_config(
                "storage.timeout_secs",
                "must be greater than zero",
            ));
        }
        Ok(())
    }
}

// ============================================================================
// Catalog
// ============================================================================

/// Which catalog implementation to use
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CatalogConfig {
    /// Process-local catalog, lost on exit
    #[default]
    Memory,

    /// JSON entries stored under a root URL
    File { root: String },
}

impl CatalogConfig {
    pub fn validate(&self) -> Result<()> {
        match self {
            CatalogConfig::File { root } if root.trim().is_empty() => {
                Err(Error::missing_config_field("catalog.root"))
            }
            _ => Ok(()),
        }
    }

    /// Open the configured catalog
    pub fn open(&self, storage: &StorageConfig) -> Result<Arc<dyn Catalog>> {
        Ok(match self {
            CatalogConfig::Memory => Arc::new(MemoryCatalog::new()),
            CatalogConfig::File { root } => {
                let catalog = FileCatalog::open(root)?.with_timeout(storage.timeout());
                Arc::new(catalog)
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    #[test]
    fn test_parse_full_pipeline() {
        let yaml = r#"
batch:
  job_name: youtube-raw-statistics
  source: db_youtube_raw.raw_statistics
  predicate: "region in ('ca','gb','us')"
  target_path: s3://cleansed/youtube/raw_statistics/
event:
  target_path: s3://cleansed/youtube/reference/
  catalog_database: db_youtube_cleaned
  catalog_table: cleaned_statistics_reference_data
  write_mode: overwrite_partitions
storage:
  timeout_secs: 5
catalog:
  type: file
  root: memory://catalog
"#;

        let config = PipelineConfig::from_yaml_str(yaml).unwrap();
        let batch = config.batch().unwrap();
        assert_eq!(batch.job_name, "youtube-raw-statistics");
        assert_eq!(batch.mapping, "raw_statistics");
        assert_eq!(batch.partition_key, "region");
        assert_eq!(batch.write_mode, WriteMode::Append);
        assert_eq!(
            batch.dataset().unwrap(),
            DatasetRef::table("db_youtube_raw", "raw_statistics")
        );
        assert!(batch.parsed_predicate().unwrap().is_some());

        let event = config.event().unwrap();
        assert_eq!(event.write_mode, WriteMode::Overwrite);
        assert_eq!(event.items_field, "items");

        assert_eq!(config.storage.timeout(), Duration::from_secs(5));
        assert_eq!(
            config.catalog,
            CatalogConfig::File {
                root: "memory://catalog".to_string()
            }
        );
    }

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::from_yaml_str("{}").unwrap();
        assert!(config.batch.is_none());
        assert_eq!(config.storage.timeout_secs, 30);
        assert_eq!(config.catalog, CatalogConfig::Memory);
        assert!(matches!(
            config.event().unwrap_err(),
            Error::MissingConfigField { .. }
        ));
    }

    #[test]
    fn test_batch_write_options() {
        let mut batch = BatchJobConfig::new("db.t", "memory://out");
        batch.write_mode = WriteMode::Overwrite;
        let options = batch.write_options();
        assert_eq!(options.partition_keys, vec!["region"]);
        assert!(options.coalesce);
        assert_eq!(options.mode, WriteMode::Overwrite);
        assert!(options.catalog.is_none());
    }

    #[test]
    fn test_batch_url_source_takes_partition_keys() {
        let mut batch = BatchJobConfig::new("memory://raw/stats", "memory://out");
        batch.source_partition_keys = vec!["region".to_string()];
        batch.source_format = Some(DecoderFormat::Csv);
        assert_eq!(
            batch.dataset().unwrap(),
            DatasetRef::path("memory://raw/stats", ["region"]).with_format(DecoderFormat::Csv)
        );
    }

    #[test]
    fn test_batch_validation_fails_fast() {
        let err = BatchJobConfig::new("", "memory://out").validate().unwrap_err();
        assert!(matches!(err, Error::MissingConfigField { .. }));

        let mut batch = BatchJobConfig::new("db.t", "memory://out");
        batch.predicate = Some("region in (".to_string());
        assert!(matches!(
            batch.validate().unwrap_err(),
            Error::InvalidPredicate { .. }
        ));

        batch.predicate = Some("  ".to_string());
        assert!(batch.validate().is_ok());
    }

    #[test]
    fn test_event_from_lookup() {
        let vars: HashMap<&str, &str> = [
            ("s3_cleansed_layer", "s3://cleansed/ref/"),
            ("CATALOG_DB_NAME", "db_youtube_cleaned"),
            ("glue_catalog_table_name", "reference"),
            ("write_data_operation", "append"),
        ]
        .into_iter()
        .collect();

        let config =
            EventHandlerConfig::from_lookup(|name| vars.get(name).map(|v| (*v).to_string()))
                .unwrap();
        assert_eq!(config.target_path, "s3://cleansed/ref/");
        assert_eq!(config.catalog_database, "db_youtube_cleaned");
        assert_eq!(config.catalog_table, "reference");
        assert_eq!(config.write_mode, WriteMode::Append);

        let options = config.write_options();
        assert!(options.partition_keys.is_empty());
        assert_eq!(options.catalog.unwrap().table, "reference");
    }

    #[test]
    fn test_event_from_lookup_missing_and_invalid() {
        let err = EventHandlerConfig::from_lookup(|_| None).unwrap_err();
        assert!(
            matches!(err, Error::MissingConfigField { ref field } if field == "CLEANSED_LAYER_PATH")
        );

        let err = EventHandlerConfig::from_lookup(|name| match name {
            "WRITE_DATA_OPERATION" => Some("upsert".to_string()),
            _ => Some("x".to_string()),
        })
        .unwrap_err();
        assert!(matches!(err, Error::InvalidConfigValue { .. }));
    }

    #[test]
    fn test_event_validation() {
        let config = EventHandlerConfig::new("memory://out", "", "t");
        assert!(matches!(
            config.validate().unwrap_err(),
            Error::MissingConfigField { .. }
        ));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let err = PipelineConfig::from_yaml_str("storage:\n  timeout_secs: 0\n").unwrap_err();
        assert!(matches!(err, Error::InvalidConfigValue { .. }));
    }

    #[test]
    fn test_catalog_open() {
        let storage = StorageConfig::default();
        assert!(CatalogConfig::Memory.open(&storage).is_ok());
        assert!(CatalogConfig::File {
            root: "memory://config-catalog".to_string()
        }
        .open(&storage)
        .is_ok());
        assert!(CatalogConfig::File {
            root: String::new()
        }
        .validate()
        .is_err());
    }
}
