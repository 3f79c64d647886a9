// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::ref_option)]
#![allow(clippy::unused_self)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::match_wildcard_for_single_variants)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # cleanse-etl
//!
//! Ingests semi-structured data landing in object storage, normalizes it
//! into a tabular schema and persists it as partitioned Parquet registered
//! in a catalog.
//!
//! ## Features
//!
//! - **Predicate-scoped extraction**: `region in ('ca','gb','us')` prunes
//!   Hive partition directories before any file is read
//! - **Schema mapping**: ordered YAML mapping tables with exact type coercion
//! - **Flattening**: one row per element of a document's `items` array
//! - **Partitioned Parquet**: append or partition-scoped overwrite, committed
//!   atomically per partition through manifests
//! - **Catalog registration**: best-effort, reported in the write result
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use cleanse_etl::{BatchJob, PipelineConfig, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = PipelineConfig::load("pipeline.yaml")?;
//!     let catalog = config.catalog.open(&config.storage)?;
//!
//!     let report = BatchJob::new(config.batch()?, &config.storage)?
//!         .with_catalog(catalog)
//!         .run()
//!         .await?;
//!     println!("{} rows written", report.write.rows_written);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//!   batch:  Extractor ──► SchemaMapper ──► PartitionedWriter ──► _SUCCESS
//!              │                                  │
//!   event:  ObjectEvent ─► Flattener ─────────────┤
//!              │                                  ▼
//!         StorageLocation (object_store)       Catalog
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types for the pipeline
pub mod error;

/// Common types and type aliases
pub mod types;

/// Pipeline configuration
pub mod config;

/// Mapping tables and type coercion
pub mod mapping;

/// Nested document flattening
pub mod flatten;

/// Filter predicates over record attributes
pub mod predicate;

/// Source file decoders (JSON, JSONL, CSV, Parquet)
pub mod decode;

/// Object storage access and Hive path helpers
pub mod storage;

/// Table catalog
pub mod catalog;

/// Predicate-scoped extraction
pub mod extract;

/// Arrow/Parquet output and the partitioned writer
pub mod output;

/// Batch job and event handler
pub mod pipeline;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, ErrorKind, Result};
pub use types::*;

// Re-export commonly used types
pub use catalog::{Catalog, FileCatalog, MemoryCatalog, TableEntry};
pub use config::{BatchJobConfig, EventHandlerConfig, PipelineConfig};
pub use extract::{DatasetRef, Extractor};
pub use flatten::Flattener;
pub use mapping::{load_mapping, MappingTable, SchemaMapper};
pub use output::{PartitionedWriter, WriteOptions, WriteResult};
pub use pipeline::{BatchJob, EventHandler, ObjectEvent};
pub use predicate::{parse_predicate, Predicate};
pub use storage::{Access, StorageLocation};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
