//! Decoder implementations
//!
//! Each decoder handles a specific file format. Values are passed through
//! untyped where the format has no types of its own (CSV); the schema mapper
//! does the coercion.

use super::types::RecordDecoder;
use crate::error::{Error, Result};
use crate::output::batch_to_records;
use crate::types::Record;
use bytes::Bytes;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value;

// ============================================================================
// JSON Decoder
// ============================================================================

/// JSON decoder for a top-level array of objects or a single object
#[derive(Debug, Clone, Default)]
pub struct JsonDecoder;

impl JsonDecoder {
    pub fn new() -> Self {
        Self
    }
}

impl RecordDecoder for JsonDecoder {
    fn decode(&self, path: &str, body: &[u8]) -> Result<Vec<Record>> {
        let value: Value = serde_json::from_slice(body)
            .map_err(|e| Error::decode(path, format!("Failed to parse JSON: {e}")))?;

        match value {
            Value::Array(items) => items
                .into_iter()
                .enumerate()
                .map(|(idx, item)| match item {
                    Value::Object(obj) => Ok(obj),
                    other => Err(Error::decode(
                        path,
                        format!("element {idx} is not an object: {other}"),
                    )),
                })
                .collect(),
            Value::Object(obj) => Ok(vec![obj]),
            other => Err(Error::decode(
                path,
                format!("expected an array or object, got {other}"),
            )),
        }
    }
}

// ============================================================================
// JSONL Decoder
// ============================================================================

/// JSON Lines decoder (one JSON object per line)
#[derive(Debug, Clone, Default)]
pub struct JsonlDecoder;

impl JsonlDecoder {
    pub fn new() -> Self {
        Self
    }
}

impl RecordDecoder for JsonlDecoder {
    fn decode(&self, path: &str, body: &[u8]) -> Result<Vec<Record>> {
        let text = std::str::from_utf8(body)
            .map_err(|e| Error::decode(path, format!("invalid UTF-8: {e}")))?;
        let mut records = Vec::new();

        for (line_num, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            match serde_json::from_str(line) {
                Ok(Value::Object(obj)) => records.push(obj),
                Ok(other) => {
                    return Err(Error::decode(
                        path,
                        format!("line {} is not an object: {other}", line_num + 1),
                    ))
                }
                Err(e) => {
                    return Err(Error::decode(
                        path,
                        format!("Failed to parse JSONL at line {}: {e}", line_num + 1),
                    ))
                }
            }
        }

        Ok(records)
    }
}

// ============================================================================
// CSV Decoder
// ============================================================================

/// CSV decoder with configurable delimiter and header handling
///
/// Quoted fields may span lines. Every value is a string, except fields
/// equal to the null marker (empty by default) which become null. Short
/// rows are padded with nulls and extra fields are ignored.
#[derive(Debug, Clone)]
pub struct CsvDecoder {
    delimiter: u8,
    has_header: bool,
    null_string: String,
}

impl Default for CsvDecoder {
    fn default() -> Self {
        Self {
            delimiter: b',',
            has_header: true,
            null_string: String::new(),
        }
    }
}

impl CsvDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a CSV decoder with custom settings
    pub fn with_options(delimiter: u8, has_header: bool) -> Self {
        Self {
            delimiter,
            has_header,
            ..Self::default()
        }
    }

    /// Value that decodes to null
    #[must_use]
    pub fn with_null_string(mut self, null_string: impl Into<String>) -> Self {
        self.null_string = null_string.into();
        self
    }
}

impl RecordDecoder for CsvDecoder {
    fn decode(&self, path: &str, body: &[u8]) -> Result<Vec<Record>> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(self.has_header)
            .flexible(true)
            .from_reader(body);

        let mut headers: Vec<String> = if self.has_header {
            reader
                .headers()
                .map_err(|e| Error::decode(path, format!("Failed to read CSV header: {e}")))?
                .iter()
                .map(|h| h.trim().to_string())
                .collect()
        } else {
            Vec::new()
        };

        let mut records = Vec::new();
        for (row_num, row) in reader.records().enumerate() {
            let row = row.map_err(|e| {
                Error::decode(path, format!("Failed to parse CSV row {}: {e}", row_num + 1))
            })?;

            // Without a header the first row fixes the column count
            if headers.is_empty() {
                headers = (0..row.len()).map(|i| format!("column_{i}")).collect();
            }

            let mut obj = Record::new();
            for (i, header) in headers.iter().enumerate() {
                let value = match row.get(i) {
                    Some(field) if field != self.null_string => Value::String(field.to_string()),
                    _ => Value::Null,
                };
                obj.insert(header.clone(), value);
            }
            records.push(obj);
        }

        Ok(records)
    }
}

// ============================================================================
// Parquet Decoder
// ============================================================================

/// Parquet decoder reading every row group of a file held in memory
#[derive(Debug, Clone, Default)]
pub struct ParquetDecoder {
    batch_size: Option<usize>,
}

impl ParquetDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rows per decoded Arrow batch
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = Some(batch_size);
        self
    }
}

impl RecordDecoder for ParquetDecoder {
    fn decode(&self, path: &str, body: &[u8]) -> Result<Vec<Record>> {
        let mut builder = ParquetRecordBatchReaderBuilder::try_new(Bytes::copy_from_slice(body))
            .map_err(|e| Error::decode(path, format!("Failed to open Parquet file: {e}")))?;
        if let Some(size) = self.batch_size {
            builder = builder.with_batch_size(size);
        }
        let reader = builder
            .build()
            .map_err(|e| Error::decode(path, format!("Failed to read Parquet file: {e}")))?;

        let mut records = Vec::new();
        for batch in reader {
            let batch = batch
                .map_err(|e| Error::decode(path, format!("Failed to read row group: {e}")))?;
            records.extend(batch_to_records(&batch)?);
        }
        Ok(records)
    }
}
