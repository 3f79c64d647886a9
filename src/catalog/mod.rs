//! Table catalog
//!
//! # Overview
//!
//! The writer registers each dataset it writes as a (database, table) entry
//! so query engines can find it; the extractor resolves `database.table`
//! source identifiers through the same interface.
//!
//! - `Catalog` - async trait over the metadata store
//! - `MemoryCatalog` - in-process implementation
//! - `FileCatalog` - JSON documents in object storage

mod file;
mod memory;
mod types;

pub use file::FileCatalog;
pub use memory::MemoryCatalog;
pub use types::{catalog_type, Catalog, ColumnDef, TableEntry};

#[cfg(test)]
mod tests;
