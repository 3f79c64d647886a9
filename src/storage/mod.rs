//! Object storage access
//!
//! # Overview
//!
//! - `StorageLocation` - a root path in S3, GCS, Azure, memory or the local
//!   filesystem; every call is bounded by a timeout
//! - Hive path helpers for `key=value` partition directories

mod location;
mod paths;

pub use location::{Access, Listing, ObjectEntry, StorageLocation, DEFAULT_TIMEOUT};
pub use paths::{
    escape_partition_value, is_hidden_path, parse_partition_path, parse_partition_segment,
    partition_dir, unescape_partition_value,
};

#[cfg(test)]
pub(crate) mod faulty;
#[cfg(test)]
mod tests;
