//! Nested record flattening
//!
//! Turns a JSON document holding one top-level array of objects into a
//! flat row set, one record per array element.
//!
//! Nested objects inside an element are expanded into dotted column names
//! (`snippet.title`). Arrays inside an element are kept as values and never
//! flattened further. No type coercion happens here.

mod flattener;

pub use flattener::{Flattener, DEFAULT_ITEMS_FIELD, DEFAULT_SEPARATOR};
