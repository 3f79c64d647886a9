//! Predicate-scoped extraction from source datasets
//!
//! # Overview
//!
//! - `DatasetRef` - `database.table` or a location with partition keys
//! - `Extractor` - resolves the dataset, prunes partition directories with
//!   the part of the predicate over partition columns, decodes the
//!   remaining files and filters records with the rest

mod dataset;
mod extractor;

pub use dataset::DatasetRef;
pub use extractor::{Extractor, ScanStats};

#[cfg(test)]
mod tests;
