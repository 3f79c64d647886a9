//! Predicate-scoped extraction
//!
//! Partition directories are walked one level at a time. A conjunct over
//! partition columns is checked as soon as all of its columns are bound, so
//! non-matching directories are never listed or read. Remaining conjuncts
//! are applied to each decoded record.

use super::dataset::DatasetRef;
use crate::catalog::Catalog;
use crate::decode::DecoderFormat;
use crate::error::{Error, Result};
use crate::output::committed_files;
use crate::predicate::{split_predicates, Predicate};
use crate::storage::{is_hidden_path, parse_partition_segment, Access, StorageLocation};
use crate::types::{JsonValue, Record, RowSet};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Attempts at reading a partition whose files vanish under a concurrent overwrite
const PARTITION_READ_ATTEMPTS: usize = 3;

/// A dataset resolved to a location
#[derive(Debug, Clone)]
struct ResolvedDataset {
    location: StorageLocation,
    partition_keys: Vec<String>,
    format: Option<DecoderFormat>,
    /// Columns known up front (catalog tables)
    columns: Option<Vec<String>>,
}

/// Counters reported after a scan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanStats {
    pub partitions_read: usize,
    pub partitions_pruned: usize,
    pub files_read: usize,
    pub rows_scanned: usize,
    pub rows_matched: usize,
}

/// Reads the subset of a dataset matching a predicate
#[derive(Clone)]
pub struct Extractor {
    catalog: Option<Arc<dyn Catalog>>,
    timeout: Option<Duration>,
    pushdown: bool,
}

impl std::fmt::Debug for Extractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Extractor")
            .field("catalog", &self.catalog.is_some())
            .field("timeout", &self.timeout)
            .field("pushdown", &self.pushdown)
            .finish()
    }
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new()
    }
}

impl Extractor {
    pub fn new() -> Self {
        Self {
            catalog: None,
            timeout: None,
            pushdown: true,
        }
    }

    /// Catalog used to resolve `database.table` identifiers
    #[must_use]
    pub fn with_catalog(mut self, catalog: Arc<dyn Catalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Per-call storage timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Read every partition and filter records afterwards
    #[must_use]
    pub fn without_pushdown(mut self) -> Self {
        self.pushdown = false;
        self
    }

    /// Return the records of `dataset` satisfying `predicate`
    pub async fn extract(
        &self,
        dataset: &DatasetRef,
        predicate: Option<&Predicate>,
    ) -> Result<RowSet> {
        self.extract_with_stats(dataset, predicate)
            .await
            .map(|(rows, _)| rows)
    }

    /// Like [`Extractor::extract`], also returning scan counters
    pub async fn extract_with_stats(
        &self,
        dataset: &DatasetRef,
        predicate: Option<&Predicate>,
    ) -> Result<(RowSet, ScanStats)> {
        let resolved = self.resolve(dataset).await?;

        if let (Some(pred), Some(columns)) = (predicate, &resolved.columns) {
            check_columns(pred, columns.iter().map(String::as_str))?;
        }

        let (pushable, local) = match predicate {
            Some(pred) if self.pushdown => {
                let split = split_predicates(pred.clone(), &resolved.partition_keys);
                debug!(
                    dataset = %dataset,
                    pushed = split.pushable.len(),
                    local = split.local.len(),
                    "Predicate split"
                );
                (split.pushable, Predicate::conjunction(split.local))
            }
            Some(pred) => (Vec::new(), Some(pred.clone())),
            None => (Vec::new(), None),
        };

        let mut stats = ScanStats::default();
        let partitions = self
            .find_partitions(&resolved, &pushable, &mut stats)
            .await?;

        let mut matched = Vec::new();
        let mut seen_columns: BTreeSet<String> = resolved.partition_keys.iter().cloned().collect();

        for (dir, values) in &partitions {
            let records = self.read_partition(&resolved, dir, values, &mut stats).await?;
            stats.partitions_read += 1;
            stats.rows_scanned += records.len();

            for record in records {
                if resolved.columns.is_none() {
                    seen_columns.extend(record.keys().cloned());
                }
                if local.as_ref().map_or(true, |p| p.evaluate(&record)) {
                    matched.push(record);
                }
            }
        }

        // Path datasets have no declared schema; check against what was read,
        // or against a sample when pruning left nothing to read
        if let (Some(pred), None) = (predicate, &resolved.columns) {
            if stats.rows_scanned > 0 {
                check_columns(pred, seen_columns.iter().map(String::as_str))?;
            } else if let Some(sampled) = self.sample_columns(&resolved).await? {
                check_columns(pred, sampled.iter().map(String::as_str))?;
            }
        }

        stats.rows_matched = matched.len();
        info!(
            dataset = %dataset,
            partitions = stats.partitions_read,
            pruned = stats.partitions_pruned,
            files = stats.files_read,
            scanned = stats.rows_scanned,
            rows = stats.rows_matched,
            "Extraction complete"
        );

        Ok((RowSet::new(matched), stats))
    }

    async fn resolve(&self, dataset: &DatasetRef) -> Result<ResolvedDataset> {
        let mut resolved = match dataset {
            DatasetRef::Table { database, table } => {
                let catalog = self.catalog.as_ref().ok_or_else(|| {
                    Error::source_unavailable(dataset.to_string(), "no catalog configured")
                })?;
                let entry = catalog
                    .get_table(database, table)
                    .await
                    .map_err(|e| Error::source_unavailable(dataset.to_string(), e.to_string()))?
                    .ok_or_else(|| {
                        Error::source_unavailable(dataset.to_string(), "table not found in catalog")
                    })?;

                let format = entry.format.parse::<DecoderFormat>().ok();
                ResolvedDataset {
                    location: StorageLocation::parse(&entry.location, Access::Read)?,
                    columns: Some(
                        entry
                            .all_column_names()
                            .into_iter()
                            .map(str::to_string)
                            .collect(),
                    ),
                    partition_keys: entry.partition_keys,
                    format,
                }
            }
            DatasetRef::Path {
                url,
                partition_keys,
                format,
            } => ResolvedDataset {
                location: StorageLocation::parse(url, Access::Read)?,
                partition_keys: partition_keys.clone(),
                format: *format,
                columns: None,
            },
        };

        if let Some(timeout) = self.timeout {
            resolved.location = resolved.location.with_timeout(timeout);
        }
        Ok(resolved)
    }

    /// Walk the partition directories, pruning with the pushed conjuncts
    async fn find_partitions(
        &self,
        dataset: &ResolvedDataset,
        pushable: &[Predicate],
        stats: &mut ScanStats,
    ) -> Result<Vec<(String, BTreeMap<String, String>)>> {
        let depth = dataset.partition_keys.len();
        let mut level: Vec<(String, BTreeMap<String, String>)> =
            vec![(String::new(), BTreeMap::new())];

        for _ in 0..depth {
            let mut next = Vec::new();
            for (dir, values) in level {
                let listing = dataset.location.list_level(&dir).await?;
                for child in listing.dirs {
                    let segment = child.rsplit('/').next().unwrap_or(&child);
                    if is_hidden_path(segment) {
                        continue;
                    }
                    let Some((key, value)) = parse_partition_segment(segment) else {
                        debug!(dir = %child, "Skipping non-partition directory");
                        continue;
                    };

                    let mut bound = values.clone();
                    bound.insert(key, value);
                    if prunes(pushable, &bound) {
                        stats.partitions_pruned += 1;
                        debug!(dir = %child, "Partition pruned");
                        continue;
                    }
                    next.push((child, bound));
                }
            }
            level = next;
        }

        Ok(level)
    }

    /// Columns of the first non-empty partition, ignoring any predicate
    ///
    /// `None` when the dataset holds no rows at all.
    async fn sample_columns(&self, dataset: &ResolvedDataset) -> Result<Option<BTreeSet<String>>> {
        let mut ignored = ScanStats::default();
        for (dir, values) in self.find_partitions(dataset, &[], &mut ignored).await? {
            let records = self.read_partition(dataset, &dir, &values, &mut ignored).await?;
            if let Some(first) = records.first() {
                let mut columns: BTreeSet<String> =
                    dataset.partition_keys.iter().cloned().collect();
                columns.extend(first.keys().cloned());
                return Ok(Some(columns));
            }
        }
        Ok(None)
    }

    /// Read one partition's committed files
    ///
    /// An overwrite that commits while the files are being read deletes the
    /// old ones; the file list is then re-read from the new manifest.
    async fn read_partition(
        &self,
        dataset: &ResolvedDataset,
        dir: &str,
        values: &BTreeMap<String, String>,
        stats: &mut ScanStats,
    ) -> Result<Vec<Record>> {
        let mut attempt = 0;
        'attempts: loop {
            attempt += 1;
            let files = committed_files(&dataset.location, dir).await?;
            let mut records = Vec::new();
            let mut files_read = 0;

            for file in &files {
                let Some(format) = dataset.format.or_else(|| DecoderFormat::from_path(file))
                else {
                    debug!(file = %file, "Skipping file with unknown format");
                    continue;
                };

                let Some(body) = dataset.location.get_opt(file).await? else {
                    if attempt < PARTITION_READ_ATTEMPTS {
                        debug!(file = %file, attempt, "File vanished; re-reading partition");
                        continue 'attempts;
                    }
                    return Err(Error::source_unavailable(
                        dataset.location.full_url(file),
                        "file disappeared while reading",
                    ));
                };

                let decoded = format
                    .decoder()
                    .decode(&dataset.location.full_url(file), &body)?;
                files_read += 1;

                for mut record in decoded {
                    for (key, value) in values {
                        if !record.contains_key(key) {
                            record.insert(key.clone(), JsonValue::String(value.clone()));
                        }
                    }
                    records.push(record);
                }
            }

            stats.files_read += files_read;
            return Ok(records);
        }
    }
}

/// Whether a bound set of partition values fails any evaluable conjunct
fn prunes(pushable: &[Predicate], bound: &BTreeMap<String, String>) -> bool {
    pushable.iter().any(|conjunct| {
        let evaluable = conjunct.columns().iter().all(|c| bound.contains_key(*c));
        evaluable && !conjunct.evaluate_partition(bound)
    })
}

fn check_columns<'a>(predicate: &Predicate, known: impl Iterator<Item = &'a str>) -> Result<()> {
    let known: BTreeSet<&str> = known.collect();
    let unknown: Vec<&str> = predicate
        .columns()
        .into_iter()
        .filter(|c| !known.contains(c))
        .collect();

    if unknown.is_empty() {
        Ok(())
    } else {
        Err(Error::invalid_predicate(
            predicate.to_string(),
            format!("unknown field(s): {}", unknown.join(", ")),
        ))
    }
}
