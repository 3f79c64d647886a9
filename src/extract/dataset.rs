//! Source dataset identifiers

use crate::decode::DecoderFormat;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies the dataset an extraction reads
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DatasetRef {
    /// A catalog table, resolved to a location at extraction time
    Table { database: String, table: String },
    /// A dataset root given directly
    Path {
        url: String,
        #[serde(default)]
        partition_keys: Vec<String>,
        #[serde(default)]
        format: Option<DecoderFormat>,
    },
}

impl DatasetRef {
    pub fn table(database: impl Into<String>, table: impl Into<String>) -> Self {
        Self::Table {
            database: database.into(),
            table: table.into(),
        }
    }

    pub fn path<I, S>(url: impl Into<String>, partition_keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Path {
            url: url.into(),
            partition_keys: partition_keys.into_iter().map(Into::into).collect(),
            format: None,
        }
    }

    /// Fix the file format instead of guessing it from extensions
    #[must_use]
    pub fn with_format(self, format: DecoderFormat) -> Self {
        match self {
            Self::Path {
                url,
                partition_keys,
                ..
            } => Self::Path {
                url,
                partition_keys,
                format: Some(format),
            },
            table => table,
        }
    }

    /// Parse `database.table` or a location URL
    ///
    /// Anything with a scheme or a slash is a location; otherwise the
    /// identifier must be exactly `database.table`.
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.contains("://") || s.contains('/') {
            return Ok(Self::path(s, Vec::<String>::new()));
        }
        match s.split_once('.') {
            Some((db, table)) if !db.is_empty() && !table.is_empty() && !table.contains('.') => {
                Ok(Self::table(db, table))
            }
            _ => Err(Error::source_unavailable(
                s,
                "expected 'database.table' or a location URL",
            )),
        }
    }
}

impl fmt::Display for DatasetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Table { database, table } => write!(f, "{database}.{table}"),
            Self::Path { url, .. } => f.write_str(url),
        }
    }
}
