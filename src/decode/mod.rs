//! Source file decoders
//!
//! Supports: JSON, JSONL, CSV, Parquet
//!
//! # Overview
//!
//! Each decoder turns the bytes of one source file into records. The
//! extractor picks a decoder from the dataset's declared format, or from the
//! file extension when the dataset does not declare one.

mod decoders;
mod types;

pub use decoders::{CsvDecoder, JsonDecoder, JsonlDecoder, ParquetDecoder};
pub use types::{DecoderFormat, RecordDecoder};
