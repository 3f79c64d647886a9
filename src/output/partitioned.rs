//! Partitioned Parquet writer
//!
//! Groups a row set by its partition values and writes each group under
//! `<target>/<k1>=<v1>/<k2>=<v2>/`. A write goes through four phases:
//!
//! 1. prepare: read each affected partition's manifest; a partition without
//!    one gets a manifest adopting its current files
//! 2. stage: write every data file of every partition
//! 3. commit: replace each partition's manifest
//! 4. cleanup: delete files an overwrite superseded
//!
//! Nothing a reader can see changes before phase 3, so a failure while
//! staging leaves every partition as it was. A failure during phase 3 puts
//! back the manifests already replaced and removes the staged files.

use super::manifest::{
    list_data_files, read_manifest, write_manifest, PartitionManifest, SUCCESS_MARKER,
};
use super::schema::{infer_schema, records_to_batch};
use super::types::{CatalogOutcome, CatalogTarget, WriteOptions, WriteResult};
use super::writer::{write_parquet_bytes, ParquetWriterConfig};
use crate::catalog::{Catalog, TableEntry};
use crate::error::{Error, Result};
use crate::storage::{partition_dir, Access, StorageLocation};
use crate::types::{CompressionCodec, ErrorPolicy, JsonValue, Record, RowSet, WriteMode};
use arrow::datatypes::{Schema, SchemaRef};
use bytes::Bytes;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Records of one partition, with partition columns removed
#[derive(Debug)]
struct PartitionGroup {
    values: Vec<(String, String)>,
    records: Vec<Record>,
}

impl PartitionGroup {
    fn dir(&self) -> String {
        partition_dir(&self.values)
    }
}

/// A partition ready for commit
#[derive(Debug)]
struct StagedPartition {
    dir: String,
    values: Vec<(String, String)>,
    previous: PartitionManifest,
    /// Manifest found right before the swap, once committed
    replaced: Option<PartitionManifest>,
    files: Vec<String>,
    rows: usize,
}

/// Writes row sets as partitioned Parquet datasets
#[derive(Clone)]
pub struct PartitionedWriter {
    target: StorageLocation,
    catalog: Option<Arc<dyn Catalog>>,
    parquet: ParquetWriterConfig,
}

impl std::fmt::Debug for PartitionedWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PartitionedWriter")
            .field("target", &self.target.url())
            .field("catalog", &self.catalog.is_some())
            .finish()
    }
}

impl PartitionedWriter {
    /// Create a writer for a dataset root
    pub fn new(target: StorageLocation) -> Self {
        Self {
            target: target.with_access(Access::Write),
            catalog: None,
            parquet: ParquetWriterConfig::default(),
        }
    }

    /// Catalog used when a write asks for registration
    #[must_use]
    pub fn with_catalog(mut self, catalog: Arc<dyn Catalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Base Parquet settings; compression is set per write
    #[must_use]
    pub fn with_parquet_config(mut self, config: ParquetWriterConfig) -> Self {
        self.parquet = config;
        self
    }

    pub fn target(&self) -> &StorageLocation {
        &self.target
    }

    /// Write a row set
    pub async fn write(&self, rows: &RowSet, options: &WriteOptions) -> Result<WriteResult> {
        options.validate()?;

        let schema: SchemaRef = match rows.schema() {
            Some(schema) => Arc::clone(schema),
            None => Arc::new(infer_schema(rows.records())),
        };
        let data_schema = data_schema(&schema, &options.partition_keys)?;
        let (groups, rows_skipped) = group_records(rows.records(), options)?;

        let mut result = WriteResult {
            rows_skipped,
            ..WriteResult::default()
        };

        if groups.is_empty() {
            info!(
                target = %self.target.url(),
                skipped = rows_skipped,
                "No records to write"
            );
            return Ok(result);
        }

        let write_id = Uuid::new_v4().to_string();
        let previous = self.prepare(&groups, &write_id).await?;

        let mut staged = self
            .stage(groups, previous, &data_schema, options, &write_id)
            .await?;

        self.commit(&mut staged, options.mode, &write_id).await?;

        for partition in &staged {
            result.paths.extend(
                partition
                    .files
                    .iter()
                    .map(|f| self.target.full_url(&join(&partition.dir, f))),
            );
            result.partitions_values.insert(
                format!("{}/", self.target.full_url(&partition.dir)),
                partition.values.iter().map(|(_, v)| v.clone()).collect(),
            );
            result.rows_written += partition.rows;
        }

        if options.mode == WriteMode::Overwrite {
            self.cleanup(&staged).await;
        }

        if let Some(target) = &options.catalog {
            result.catalog = Some(self.register(target, &data_schema, &staged, options).await);
        }

        info!(
            target = %self.target.url(),
            mode = %options.mode,
            partitions = staged.len(),
            files = result.paths.len(),
            rows = result.rows_written,
            skipped = result.rows_skipped,
            "Write committed"
        );

        Ok(result)
    }

    /// Write the `_SUCCESS` marker at the dataset root
    pub async fn mark_success(&self) -> Result<()> {
        self.target
            .put(SUCCESS_MARKER, Bytes::from_static(b""))
            .await
    }

    /// Make sure every affected partition is managed by a manifest
    async fn prepare(
        &self,
        groups: &[PartitionGroup],
        write_id: &str,
    ) -> Result<Vec<PartitionManifest>> {
        let mut manifests = Vec::with_capacity(groups.len());

        for group in groups {
            let dir = group.dir();
            let manifest = match read_manifest(&self.target, &dir).await? {
                Some(manifest) => manifest,
                None => {
                    // Adopt files written by other tools so readers keep seeing them
                    let existing = list_data_files(&self.target, &dir).await?;
                    let manifest = PartitionManifest::initial(write_id, existing);
                    write_manifest(&self.target, &dir, &manifest).await?;
                    manifest
                }
            };
            manifests.push(manifest);
        }

        Ok(manifests)
    }

    /// Write all data files; on failure remove what was written
    async fn stage(
        &self,
        groups: Vec<PartitionGroup>,
        previous: Vec<PartitionManifest>,
        data_schema: &SchemaRef,
        options: &WriteOptions,
        write_id: &str,
    ) -> Result<Vec<StagedPartition>> {
        let config = self.parquet.clone().with_compression(options.compression);
        let mut staged: Vec<StagedPartition> = Vec::with_capacity(groups.len());

        for (group, previous) in groups.into_iter().zip(previous) {
            let dir = group.dir();
            let chunk_size = if options.coalesce {
                group.records.len().max(1)
            } else {
                options.max_rows_per_file
            };

            let mut partition = StagedPartition {
                dir,
                values: group.values,
                previous,
                replaced: None,
                files: Vec::new(),
                rows: group.records.len(),
            };

            for (idx, chunk) in group.records.chunks(chunk_size).enumerate() {
                let name = data_file_name(idx, write_id, options.compression);
                let written = self
                    .write_file(&partition.dir, &name, chunk, data_schema, &config)
                    .await;
                if let Err(e) = written {
                    staged.push(partition);
                    self.discard(&staged).await;
                    return Err(e);
                }
                partition.files.push(name);
            }

            debug!(
                partition = %partition.dir,
                files = partition.files.len(),
                rows = partition.rows,
                "Partition staged"
            );
            staged.push(partition);
        }

        Ok(staged)
    }

    async fn write_file(
        &self,
        dir: &str,
        name: &str,
        records: &[Record],
        schema: &SchemaRef,
        config: &ParquetWriterConfig,
    ) -> Result<()> {
        let batch = records_to_batch(records, schema)?;
        let bytes = write_parquet_bytes(Arc::clone(schema), &[batch], config)?;
        self.target.put(&join(dir, name), bytes).await
    }

    /// Best-effort removal of staged files after a failed write
    async fn discard(&self, staged: &[StagedPartition]) {
        for partition in staged {
            for file in &partition.files {
                if let Err(e) = self.target.delete(&join(&partition.dir, file)).await {
                    warn!(file = %file, error = %e, "Failed to remove staged file");
                }
            }
        }
    }

    /// Swap the manifests of all staged partitions
    ///
    /// If any swap fails, the partitions already swapped get their replaced
    /// manifest back and every staged file is removed.
    async fn commit(
        &self,
        staged: &mut [StagedPartition],
        mode: WriteMode,
        write_id: &str,
    ) -> Result<()> {
        for idx in 0..staged.len() {
            if let Err(e) = self.swap_manifest(&mut staged[idx], mode, write_id).await {
                warn!(
                    partition = %staged[idx].dir,
                    error = %e,
                    "Commit failed; restoring committed partitions"
                );
                self.restore(&staged[..idx]).await;
                self.discard(staged).await;
                return Err(e);
            }
        }
        Ok(())
    }

    /// Replace one partition's manifest
    ///
    /// The manifest is read again first: an append builds on whatever was
    /// committed since `prepare`, and cleanup knows which files it replaced.
    async fn swap_manifest(
        &self,
        partition: &mut StagedPartition,
        mode: WriteMode,
        write_id: &str,
    ) -> Result<()> {
        let current = read_manifest(&self.target, &partition.dir)
            .await?
            .unwrap_or_else(|| partition.previous.clone());

        let files = match mode {
            WriteMode::Overwrite => partition.files.clone(),
            WriteMode::Append => current
                .files
                .iter()
                .chain(&partition.files)
                .cloned()
                .collect(),
        };
        let manifest = current.next(write_id, files);
        write_manifest(&self.target, &partition.dir, &manifest).await?;
        debug!(
            partition = %partition.dir,
            version = manifest.version,
            "Partition committed"
        );
        partition.replaced = Some(current);
        Ok(())
    }

    /// Put back the manifests replaced by a failed commit
    async fn restore(&self, committed: &[StagedPartition]) {
        for partition in committed {
            let Some(replaced) = &partition.replaced else {
                continue;
            };
            if let Err(e) = write_manifest(&self.target, &partition.dir, replaced).await {
                warn!(
                    partition = %partition.dir,
                    error = %e,
                    "Failed to restore partition manifest"
                );
            }
        }
    }

    /// Delete files replaced by an overwrite
    async fn cleanup(&self, staged: &[StagedPartition]) {
        for partition in staged {
            let mut superseded: Vec<&String> = partition.previous.files.iter().collect();
            if let Some(replaced) = &partition.replaced {
                superseded.extend(&replaced.files);
            }
            superseded.sort();
            superseded.dedup();

            for file in superseded {
                if partition.files.contains(file) {
                    continue;
                }
                if let Err(e) = self.target.delete(&join(&partition.dir, file)).await {
                    warn!(
                        partition = %partition.dir,
                        file = %file,
                        error = %e,
                        "Failed to delete superseded file"
                    );
                }
            }
        }
    }

    /// Create or update the catalog entry; failures are reported, not raised
    async fn register(
        &self,
        target: &CatalogTarget,
        data_schema: &Schema,
        staged: &[StagedPartition],
        options: &WriteOptions,
    ) -> CatalogOutcome {
        let outcome = match &self.catalog {
            Some(catalog) => {
                self.upsert_entry(catalog.as_ref(), target, data_schema, staged, options)
                    .await
            }
            None => Err(Error::config("no catalog configured")),
        };

        match outcome {
            Ok(()) => {
                info!(
                    database = %target.database,
                    table = %target.table,
                    "Catalog entry updated"
                );
                CatalogOutcome {
                    database: target.database.clone(),
                    table: target.table.clone(),
                    registered: true,
                    error: None,
                }
            }
            Err(e) => {
                let err = Error::CatalogRegistrationFailed {
                    database: target.database.clone(),
                    table: target.table.clone(),
                    message: e.to_string(),
                };
                warn!(error = %err, "Catalog registration failed; data write kept");
                CatalogOutcome {
                    database: target.database.clone(),
                    table: target.table.clone(),
                    registered: false,
                    error: Some(err.to_string()),
                }
            }
        }
    }

    async fn upsert_entry(
        &self,
        catalog: &dyn Catalog,
        target: &CatalogTarget,
        data_schema: &Schema,
        staged: &[StagedPartition],
        options: &WriteOptions,
    ) -> Result<()> {
        let mut entry = catalog
            .get_table(&target.database, &target.table)
            .await?
            .unwrap_or_else(|| {
                TableEntry::new(&target.database, &target.table, self.target.url())
            });

        entry.location = self.target.url().to_string();
        entry.format = "parquet".to_string();
        entry.compression = options.compression;
        entry.partition_keys.clone_from(&options.partition_keys);
        entry = entry.with_schema(data_schema);
        for partition in staged {
            if !partition.values.is_empty() {
                entry.add_partition(partition.values.iter().cloned().collect());
            }
        }
        entry.updated_at = chrono::Utc::now();

        catalog.upsert_table(entry).await
    }
}

/// Schema of the data files: the row schema without partition columns
fn data_schema(schema: &Schema, partition_keys: &[String]) -> Result<SchemaRef> {
    let fields: Vec<_> = schema
        .fields()
        .iter()
        .filter(|f| !partition_keys.contains(f.name()))
        .cloned()
        .collect();

    if fields.is_empty() && !schema.fields().is_empty() {
        return Err(Error::schema_mismatch(
            "row set has no columns besides its partition keys",
        ));
    }
    Ok(Arc::new(Schema::new(fields)))
}

/// Group records by partition values, applying the missing-key policy
fn group_records(
    records: &[Record],
    options: &WriteOptions,
) -> Result<(Vec<PartitionGroup>, usize)> {
    let mut groups: BTreeMap<Vec<String>, Vec<Record>> = BTreeMap::new();
    let mut skipped = 0;

    'records: for (idx, record) in records.iter().enumerate() {
        let mut values = Vec::with_capacity(options.partition_keys.len());
        for key in &options.partition_keys {
            match partition_value(record.get(key), key)? {
                Some(value) => values.push(value),
                None => {
                    let err = Error::PartitionKeyMissing {
                        record: idx,
                        key: key.clone(),
                    };
                    match options.on_missing_partition_key {
                        ErrorPolicy::AbortBatch => return Err(err),
                        ErrorPolicy::SkipRecord => {
                            warn!(error = %err, "Skipping record");
                            skipped += 1;
                            continue 'records;
                        }
                    }
                }
            }
        }

        let data: Record = record
            .iter()
            .filter(|(k, _)| !options.partition_keys.contains(k))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        groups.entry(values).or_default().push(data);
    }

    let groups = groups
        .into_iter()
        .map(|(values, records)| PartitionGroup {
            values: options.partition_keys.iter().cloned().zip(values).collect(),
            records,
        })
        .collect();

    Ok((groups, skipped))
}

/// Directory value of a partition column; `None` when it is missing
fn partition_value(value: Option<&JsonValue>, key: &str) -> Result<Option<String>> {
    match value {
        None | Some(JsonValue::Null) => Ok(None),
        Some(JsonValue::String(s)) if s.is_empty() => Ok(None),
        Some(JsonValue::String(s)) => Ok(Some(s.clone())),
        Some(JsonValue::Number(n)) => Ok(Some(n.to_string())),
        Some(JsonValue::Bool(b)) => Ok(Some(b.to_string())),
        Some(other) => Err(Error::schema_mismatch(format!(
            "partition key '{key}' must hold a scalar value, got {other}"
        ))),
    }
}

fn data_file_name(idx: usize, write_id: &str, compression: CompressionCodec) -> String {
    match compression {
        CompressionCodec::None => format!("part-{idx:05}-{write_id}.parquet"),
        codec => format!("part-{idx:05}-{write_id}.{codec}.parquet"),
    }
}

fn join(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{dir}/{name}")
    }
}
