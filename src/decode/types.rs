//! Decoder types and traits
//!
//! Defines the core decoder abstractions.

use super::decoders::{CsvDecoder, JsonDecoder, JsonlDecoder, ParquetDecoder};
use crate::error::{Error, Result};
use crate::types::Record;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Format of a source data file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecoderFormat {
    /// JSON document: an array of objects or a single object
    #[default]
    Json,
    /// JSON Lines format (one JSON object per line)
    #[serde(alias = "ndjson")]
    Jsonl,
    /// CSV with a header row
    Csv,
    /// Apache Parquet
    Parquet,
}

impl DecoderFormat {
    /// Guess the format from a file name
    ///
    /// Returns `None` for unknown extensions so callers can skip or fall
    /// back to the dataset's declared format.
    pub fn from_path(path: &str) -> Option<Self> {
        let name = path.rsplit('/').next().unwrap_or(path);
        let ext = name.rsplit_once('.')?.1.to_ascii_lowercase();
        match ext.as_str() {
            "json" => Some(Self::Json),
            "jsonl" | "ndjson" => Some(Self::Jsonl),
            "csv" => Some(Self::Csv),
            "parquet" | "pq" => Some(Self::Parquet),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Jsonl => "jsonl",
            Self::Csv => "csv",
            Self::Parquet => "parquet",
        }
    }

    /// Build the default decoder for this format
    pub fn decoder(self) -> Box<dyn RecordDecoder> {
        match self {
            Self::Json => Box::new(JsonDecoder::new()),
            Self::Jsonl => Box::new(JsonlDecoder::new()),
            Self::Csv => Box::new(CsvDecoder::new()),
            Self::Parquet => Box::new(ParquetDecoder::new()),
        }
    }
}

impl FromStr for DecoderFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "jsonl" | "ndjson" => Ok(Self::Jsonl),
            "csv" => Ok(Self::Csv),
            "parquet" => Ok(Self::Parquet),
            other => Err(Error::invalid_config(
                "format",
                format!("unsupported source format '{other}'"),
            )),
        }
    }
}

impl std::fmt::Display for DecoderFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trait for decoding source files into records
pub trait RecordDecoder: Send + Sync {
    /// Decode the file body into records
    ///
    /// `path` is only used for error messages.
    fn decode(&self, path: &str, body: &[u8]) -> Result<Vec<Record>>;
}
