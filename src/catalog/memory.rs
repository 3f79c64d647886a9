//! In-process catalog

use super::types::{Catalog, TableEntry};
use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Catalog held in memory, shared between clones
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalog {
    tables: Arc<RwLock<HashMap<(String, String), TableEntry>>>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered tables across all databases
    pub async fn len(&self) -> usize {
        self.tables.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.tables.read().await.is_empty()
    }
}

#[async_trait]
impl Catalog for MemoryCatalog {
    async fn get_table(&self, database: &str, table: &str) -> Result<Option<TableEntry>> {
        let tables = self.tables.read().await;
        Ok(tables
            .get(&(database.to_string(), table.to_string()))
            .cloned())
    }

    async fn upsert_table(&self, entry: TableEntry) -> Result<()> {
        let key = (entry.database.clone(), entry.table.clone());
        self.tables.write().await.insert(key, entry);
        Ok(())
    }

    async fn list_tables(&self, database: &str) -> Result<Vec<String>> {
        let tables = self.tables.read().await;
        let mut names: Vec<String> = tables
            .keys()
            .filter(|(db, _)| db == database)
            .map(|(_, table)| table.clone())
            .collect();
        names.sort();
        Ok(names)
    }
}
