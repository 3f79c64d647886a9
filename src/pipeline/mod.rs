//! Pipeline drivers
//!
//! Both entry points share the shape extract, normalize, persist:
//!
//! - `BatchJob` - predicate-scoped read of a source dataset, schema mapping,
//!   one Parquet file per partition, `_SUCCESS` on commit
//! - `EventHandler` - one JSON object per event, flattened and written with
//!   catalog registration

mod batch;
mod event;

pub use batch::{BatchJob, BatchReport};
pub use event::{decode_object_key, EventHandler, ObjectEvent};

#[cfg(test)]
mod tests;
