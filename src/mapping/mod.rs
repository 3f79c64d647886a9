//! Schema mapping module
//!
//! Declarative field mappings and the mapper that applies them.
//!
//! # Overview
//!
//! - `MappingTable` - ordered (source, type) → (target, type) declarations
//! - `coerce` - type coercion rules between mapping field types
//! - `SchemaMapper` - renames, drops and coerces the fields of a row set
//! - Built-in tables embedded from `mappings/*.yaml`

mod builtin;
mod coerce;
mod mapper;
mod types;

pub use builtin::{get_builtin, list_builtin, load_mapping};
pub use coerce::{coerce, convert, read_as, Scalar};
pub use mapper::{MappedRows, RejectedRecord, SchemaMapper};
pub use types::{FieldMapping, FieldType, MappingTable};
