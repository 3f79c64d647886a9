//! Schema mapper
//!
//! Applies a [`MappingTable`] to a row set: renames, drops and coerces
//! fields. The mapper is a pure function of its input and table.

use super::coerce::coerce;
use super::types::MappingTable;
use crate::error::{Error, Result};
use crate::types::{ErrorPolicy, Record, RowSet};
use arrow::datatypes::SchemaRef;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

/// A record dropped under [`ErrorPolicy::SkipRecord`]
#[derive(Debug)]
pub struct RejectedRecord {
    /// Position of the record in the input row set
    pub index: usize,
    /// Why it was rejected
    pub error: Error,
}

/// Output of a mapping pass
#[derive(Debug)]
pub struct MappedRows {
    /// Mapped records with an explicit schema
    pub rows: RowSet,
    /// Records rejected under the skip policy (always empty under abort)
    pub rejected: Vec<RejectedRecord>,
}

/// Applies a mapping table to row sets
#[derive(Debug, Clone)]
pub struct SchemaMapper {
    table: MappingTable,
    schema: SchemaRef,
    policy: ErrorPolicy,
}

impl SchemaMapper {
    /// Create a mapper for a table, validating it first
    pub fn new(table: MappingTable) -> Result<Self> {
        table.validate()?;
        let schema = Arc::new(table.target_schema());
        Ok(Self {
            table,
            schema,
            policy: ErrorPolicy::default(),
        })
    }

    /// Set the per-record failure policy
    #[must_use]
    pub fn with_policy(mut self, policy: ErrorPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn table(&self) -> &MappingTable {
        &self.table
    }

    pub fn policy(&self) -> ErrorPolicy {
        self.policy
    }

    /// Schema of the mapped output
    pub fn target_schema(&self) -> SchemaRef {
        Arc::clone(&self.schema)
    }

    /// Map a whole row set
    ///
    /// Under [`ErrorPolicy::AbortBatch`] the first failing record aborts the
    /// call; under [`ErrorPolicy::SkipRecord`] failing records are collected
    /// in [`MappedRows::rejected`].
    pub fn apply(&self, rows: &RowSet) -> Result<MappedRows> {
        let mut mapped = Vec::with_capacity(rows.len());
        let mut rejected = Vec::new();

        for (index, record) in rows.records().iter().enumerate() {
            match self.map_record(index, record) {
                Ok(out) => mapped.push(out),
                Err(error) if self.policy == ErrorPolicy::SkipRecord => {
                    warn!(record = index, error = %error, "skipping record");
                    rejected.push(RejectedRecord { index, error });
                }
                Err(error) => return Err(error),
            }
        }

        debug!(
            input = rows.len(),
            mapped = mapped.len(),
            rejected = rejected.len(),
            "applied mapping table"
        );

        Ok(MappedRows {
            rows: RowSet::with_schema(self.target_schema(), mapped),
            rejected,
        })
    }

    /// Map a single record
    ///
    /// `index` is only used for error context.
    pub fn map_record(&self, index: usize, record: &Record) -> Result<Record> {
        let mut out = Record::new();

        for mapping in &self.table.mappings {
            let value = match record.get(&mapping.source_name) {
                Some(raw) => coerce(raw, mapping.source_type, mapping.target_type).map_err(
                    |message| Error::TypeCoercion {
                        record: index,
                        field: mapping.source_name.clone(),
                        from: mapping.source_type.to_string(),
                        to: mapping.target_type.to_string(),
                        message,
                    },
                )?,
                None if mapping.optional => Value::Null,
                None => {
                    return Err(Error::MissingField {
                        record: index,
                        field: mapping.source_name.clone(),
                    })
                }
            };
            out.insert(mapping.target_name.clone(), value);
        }

        Ok(out)
    }
}
