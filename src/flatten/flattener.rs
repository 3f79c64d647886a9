//! Flattener implementation

use crate::error::{Error, Result};
use crate::types::{Record, RowSet};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Default name of the top-level array field
pub const DEFAULT_ITEMS_FIELD: &str = "items";

/// Default separator between nested key segments
pub const DEFAULT_SEPARATOR: &str = ".";

/// Flattens one level of list-of-objects nesting into rows
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flattener {
    /// Top-level field holding the array of items
    #[serde(default = "default_items_field")]
    items_field: String,
    /// Separator used to join nested object keys
    #[serde(default = "default_separator")]
    separator: String,
    /// Maximum object depth to expand (None = unlimited, 0 = keep objects whole)
    #[serde(default)]
    max_level: Option<usize>,
}

fn default_items_field() -> String {
    DEFAULT_ITEMS_FIELD.to_string()
}

fn default_separator() -> String {
    DEFAULT_SEPARATOR.to_string()
}

impl Default for Flattener {
    fn default() -> Self {
        Self::new()
    }
}

impl Flattener {
    /// Create a flattener for the `items` field
    pub fn new() -> Self {
        Self {
            items_field: default_items_field(),
            separator: default_separator(),
            max_level: None,
        }
    }

    /// Use a different top-level array field
    #[must_use]
    pub fn with_items_field(mut self, field: impl Into<String>) -> Self {
        self.items_field = field.into();
        self
    }

    /// Use a different separator for nested keys
    #[must_use]
    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    /// Limit how deep nested objects are expanded
    #[must_use]
    pub fn with_max_level(mut self, level: usize) -> Self {
        self.max_level = Some(level);
        self
    }

    pub fn items_field(&self) -> &str {
        &self.items_field
    }

    /// Flatten a parsed document
    pub fn flatten(&self, document: &Value) -> Result<RowSet> {
        let Value::Object(root) = document else {
            return Err(Error::schema_mismatch(format!(
                "expected a JSON object at the top level, found {}",
                kind(document)
            )));
        };

        let items = root.get(&self.items_field).ok_or_else(|| {
            Error::schema_mismatch(format!("document has no '{}' field", self.items_field))
        })?;

        let Value::Array(items) = items else {
            return Err(Error::schema_mismatch(format!(
                "'{}' is {}, expected an array",
                self.items_field,
                kind(items)
            )));
        };

        let mut records = Vec::with_capacity(items.len());
        for (idx, item) in items.iter().enumerate() {
            let Value::Object(obj) = item else {
                return Err(Error::schema_mismatch(format!(
                    "'{}[{idx}]' is {}, expected an object",
                    self.items_field,
                    kind(item)
                )));
            };

            let mut record = Record::new();
            for (key, value) in obj {
                self.expand(&mut record, key.clone(), value, 1);
            }
            records.push(record);
        }

        Ok(RowSet::new(records))
    }

    /// Parse raw bytes as JSON and flatten
    pub fn flatten_bytes(&self, bytes: &[u8]) -> Result<RowSet> {
        let document: Value = serde_json::from_slice(bytes)
            .map_err(|e| Error::schema_mismatch(format!("object is not valid JSON: {e}")))?;
        self.flatten(&document)
    }

    fn expand(&self, record: &mut Record, key: String, value: &Value, depth: usize) {
        let within_limit = self.max_level.map_or(true, |max| depth <= max);
        match value {
            Value::Object(nested) if within_limit && !nested.is_empty() => {
                for (child, child_value) in nested {
                    let name = format!("{key}{}{child}", self.separator);
                    self.expand(record, name, child_value, depth + 1);
                }
            }
            _ => {
                record.insert(key, value.clone());
            }
        }
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
