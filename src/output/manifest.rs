//! Partition manifests
//!
//! Each partition directory written by this crate holds a `_manifest.json`
//! naming the data files that make up the partition. Data files are staged
//! next to it first; replacing the manifest is the commit. Readers that
//! honor the manifest see either the old or the new file set, never a mix.

use crate::error::Result;
use crate::storage::{is_hidden_path, StorageLocation};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Manifest file name inside a partition directory
pub const MANIFEST_FILE: &str = "_manifest.json";

/// Marker written at the dataset root when a batch run commits
pub const SUCCESS_MARKER: &str = "_SUCCESS";

/// Committed file set of one partition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionManifest {
    /// Incremented on every commit
    pub version: u64,
    /// Write that produced this version
    pub write_id: String,
    /// Data file names, relative to the partition directory
    pub files: Vec<String>,
    pub committed_at: DateTime<Utc>,
}

impl PartitionManifest {
    /// Manifest for a partition's first managed version
    pub fn initial(write_id: impl Into<String>, files: Vec<String>) -> Self {
        Self {
            version: 0,
            write_id: write_id.into(),
            files,
            committed_at: Utc::now(),
        }
    }

    /// The manifest that follows this one
    #[must_use]
    pub fn next(&self, write_id: impl Into<String>, files: Vec<String>) -> Self {
        Self {
            version: self.version + 1,
            write_id: write_id.into(),
            files,
            committed_at: Utc::now(),
        }
    }
}

fn manifest_path(dir: &str) -> String {
    if dir.is_empty() {
        MANIFEST_FILE.to_string()
    } else {
        format!("{dir}/{MANIFEST_FILE}")
    }
}

fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Read the manifest of a partition directory, if it has one
pub async fn read_manifest(
    location: &StorageLocation,
    dir: &str,
) -> Result<Option<PartitionManifest>> {
    match location.get_opt(&manifest_path(dir)).await? {
        Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        None => Ok(None),
    }
}

/// Replace the manifest of a partition directory
pub async fn write_manifest(
    location: &StorageLocation,
    dir: &str,
    manifest: &PartitionManifest,
) -> Result<()> {
    let body = serde_json::to_vec_pretty(manifest)?;
    location.put(&manifest_path(dir), Bytes::from(body)).await
}

/// Visible data file names directly inside a directory, ignoring manifests
pub async fn list_data_files(location: &StorageLocation, dir: &str) -> Result<Vec<String>> {
    let listing = location.list_level(dir).await?;
    Ok(listing
        .files
        .iter()
        .map(|entry| file_name(&entry.path).to_string())
        .filter(|name| !is_hidden_path(name))
        .collect())
}

/// Data files a reader should see in a partition directory
///
/// Returns paths relative to `location`. Directories without a manifest
/// were not written by this crate; all their visible files count.
pub async fn committed_files(location: &StorageLocation, dir: &str) -> Result<Vec<String>> {
    let names = match read_manifest(location, dir).await? {
        Some(manifest) => manifest.files,
        None => list_data_files(location, dir).await?,
    };

    Ok(names
        .into_iter()
        .map(|name| {
            if dir.is_empty() {
                name
            } else {
                format!("{dir}/{name}")
            }
        })
        .collect())
}
