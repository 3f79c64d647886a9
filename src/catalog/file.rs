//! Catalog persisted as JSON documents in object storage
//!
//! Layout: `<root>/<database>/<table>.json`, one document per table.

use super::types::{Catalog, TableEntry};
use crate::error::{Error, Result};
use crate::storage::{Access, StorageLocation};
use async_trait::async_trait;
use bytes::Bytes;

/// Catalog stored under a storage location
#[derive(Debug, Clone)]
pub struct FileCatalog {
    root: StorageLocation,
}

impl FileCatalog {
    pub fn new(root: StorageLocation) -> Self {
        Self {
            root: root.with_access(Access::Write),
        }
    }

    /// Open a catalog rooted at a URL
    pub fn open(url: &str) -> Result<Self> {
        Ok(Self::new(StorageLocation::parse(url, Access::Write)?))
    }

    /// Per-call storage timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.root = self.root.with_timeout(timeout);
        self
    }

    pub fn url(&self) -> &str {
        self.root.url()
    }

    fn entry_path(database: &str, table: &str) -> Result<String> {
        for (what, name) in [("database", database), ("table", table)] {
            if name.is_empty() || name.contains('/') || name.starts_with('.') {
                return Err(Error::invalid_config(
                    what,
                    format!("'{name}' is not a valid catalog name"),
                ));
            }
        }
        Ok(format!("{database}/{table}.json"))
    }
}

#[async_trait]
impl Catalog for FileCatalog {
    async fn get_table(&self, database: &str, table: &str) -> Result<Option<TableEntry>> {
        let path = Self::entry_path(database, table)?;
        match self.root.get_opt(&path).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn upsert_table(&self, entry: TableEntry) -> Result<()> {
        let path = Self::entry_path(&entry.database, &entry.table)?;
        let body = serde_json::to_vec_pretty(&entry)?;
        self.root.put(&path, Bytes::from(body)).await
    }

    async fn list_tables(&self, database: &str) -> Result<Vec<String>> {
        let listing = self.root.list_level(database).await?;
        let prefix = format!("{database}/");
        let mut names: Vec<String> = listing
            .files
            .iter()
            .filter_map(|entry| {
                entry
                    .path
                    .strip_prefix(&prefix)
                    .and_then(|name| name.strip_suffix(".json"))
                    .map(str::to_string)
            })
            .collect();
        names.sort();
        Ok(names)
    }
}
