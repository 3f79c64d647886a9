//! Batch reshaping job
//!
//! Extract with the configured predicate, map through the mapping table and
//! write one file per partition. The `_SUCCESS` marker is written last; a
//! run that fails before it leaves no committed change behind.

use crate::catalog::Catalog;
use crate::config::{BatchJobConfig, StorageConfig};
use crate::error::Result;
use crate::extract::{DatasetRef, Extractor};
use crate::mapping::SchemaMapper;
use crate::output::{PartitionedWriter, WriteOptions, WriteResult};
use crate::predicate::Predicate;
use crate::storage::{Access, StorageLocation};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

/// Summary of a committed batch run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchReport {
    pub job_name: String,
    pub partitions_read: usize,
    pub partitions_pruned: usize,
    pub rows_extracted: usize,
    /// Records dropped by the mapper under the skip policy
    pub rows_rejected: usize,
    pub write: WriteResult,
    pub duration_ms: u64,
}

/// A configured batch job
#[derive(Debug, Clone)]
pub struct BatchJob {
    name: String,
    dataset: DatasetRef,
    predicate: Option<Predicate>,
    extractor: Extractor,
    mapper: SchemaMapper,
    writer: PartitionedWriter,
    options: WriteOptions,
}

impl BatchJob {
    /// Build a job; configuration errors surface here, before any I/O
    pub fn new(config: &BatchJobConfig, storage: &StorageConfig) -> Result<Self> {
        config.validate()?;

        let target = StorageLocation::parse(&config.target_path, Access::Write)?
            .with_timeout(storage.timeout());

        Ok(Self {
            name: config.job_name.clone(),
            dataset: config.dataset()?,
            predicate: config.parsed_predicate()?,
            extractor: Extractor::new().with_timeout(storage.timeout()),
            mapper: SchemaMapper::new(config.mapping_table()?)?.with_policy(config.on_error),
            writer: PartitionedWriter::new(target),
            options: config.write_options(),
        })
    }

    /// Catalog used to resolve a `database.table` source
    #[must_use]
    pub fn with_catalog(mut self, catalog: Arc<dyn Catalog>) -> Self {
        self.extractor = self.extractor.with_catalog(catalog);
        self
    }

    /// Replace the extractor, e.g. to disable predicate pushdown
    #[must_use]
    pub fn with_extractor(mut self, extractor: Extractor) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run the job once
    pub async fn run(&self) -> Result<BatchReport> {
        let started = Instant::now();
        info!(job = %self.name, source = %self.dataset, "Batch job started");

        match self.execute(started).await {
            Ok(report) => {
                info!(
                    job = %self.name,
                    rows = report.write.rows_written,
                    files = report.write.paths.len(),
                    duration_ms = report.duration_ms,
                    "Batch job committed"
                );
                Ok(report)
            }
            Err(e) => {
                error!(job = %self.name, kind = %e.kind(), error = %e, "Batch job failed");
                Err(e)
            }
        }
    }

    async fn execute(&self, started: Instant) -> Result<BatchReport> {
        let (rows, scan) = self
            .extractor
            .extract_with_stats(&self.dataset, self.predicate.as_ref())
            .await?;

        let mapped = self.mapper.apply(&rows)?;
        let write = self.writer.write(&mapped.rows, &self.options).await?;
        self.writer.mark_success().await?;

        Ok(BatchReport {
            job_name: self.name.clone(),
            partitions_read: scan.partitions_read,
            partitions_pruned: scan.partitions_pruned,
            rows_extracted: scan.rows_matched,
            rows_rejected: mapped.rejected.len(),
            write,
            duration_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        })
    }
}
