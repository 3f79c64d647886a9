//! Mapping table types
//!
//! A mapping table is an ordered list of field mappings loaded from YAML.
//! It is validated once at load time and immutable afterwards.

use crate::error::{Error, Result};
use arrow::datatypes::{DataType, Field, Schema};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::str::FromStr;

/// Logical column type used on both sides of a mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum FieldType {
    String,
    /// 32-bit signed integer
    Int,
    /// 64-bit signed integer
    BigInt,
    /// 32-bit float
    Float,
    /// 64-bit float
    Double,
    Boolean,
}

impl FieldType {
    /// Canonical lowercase name
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Int => "int",
            FieldType::BigInt => "bigint",
            FieldType::Float => "float",
            FieldType::Double => "double",
            FieldType::Boolean => "boolean",
        }
    }

    /// Arrow type used when this column is written
    pub fn to_arrow(&self) -> DataType {
        match self {
            FieldType::String => DataType::Utf8,
            FieldType::Int => DataType::Int32,
            FieldType::BigInt => DataType::Int64,
            FieldType::Float => DataType::Float32,
            FieldType::Double => DataType::Float64,
            FieldType::Boolean => DataType::Boolean,
        }
    }

    /// Reverse of [`FieldType::to_arrow`] for the types this crate writes
    pub fn from_arrow(data_type: &DataType) -> Option<Self> {
        match data_type {
            DataType::Utf8 | DataType::LargeUtf8 => Some(FieldType::String),
            DataType::Int8 | DataType::Int16 | DataType::Int32 => Some(FieldType::Int),
            DataType::Int64 => Some(FieldType::BigInt),
            DataType::Float32 => Some(FieldType::Float),
            DataType::Float64 => Some(FieldType::Double),
            DataType::Boolean => Some(FieldType::Boolean),
            _ => None,
        }
    }

    /// Whether every value of `self` converts losslessly to `target`
    pub fn widens_to(&self, target: FieldType) -> bool {
        *self == target
            || matches!(
                (self, target),
                (FieldType::Int, FieldType::BigInt | FieldType::Double)
                    | (FieldType::Float, FieldType::Double)
                    | (_, FieldType::String)
            )
    }
}

impl FromStr for FieldType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "string" | "varchar" | "text" => Ok(FieldType::String),
            "int" | "integer" | "int32" => Ok(FieldType::Int),
            "long" | "bigint" | "int64" => Ok(FieldType::BigInt),
            "float" | "real" | "float32" => Ok(FieldType::Float),
            "double" | "float64" => Ok(FieldType::Double),
            "boolean" | "bool" => Ok(FieldType::Boolean),
            other => Err(Error::invalid_config(
                "field type",
                format!("unsupported type '{other}'"),
            )),
        }
    }
}

impl TryFrom<String> for FieldType {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<FieldType> for String {
    fn from(value: FieldType) -> Self {
        value.as_str().to_string()
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One (source, type) → (target, type) row of a mapping table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMapping {
    #[serde(alias = "source")]
    pub source_name: String,
    pub source_type: FieldType,
    #[serde(alias = "target")]
    pub target_name: String,
    pub target_type: FieldType,
    /// Absent source fields become null instead of failing the record
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub optional: bool,
}

impl FieldMapping {
    pub fn new(
        source_name: impl Into<String>,
        source_type: FieldType,
        target_name: impl Into<String>,
        target_type: FieldType,
    ) -> Self {
        Self {
            source_name: source_name.into(),
            source_type,
            target_name: target_name.into(),
            target_type,
            optional: false,
        }
    }

    #[must_use]
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }
}

/// Ordered, validated list of field mappings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingTable {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub mappings: Vec<FieldMapping>,
}

impl MappingTable {
    /// Build and validate a table from mappings
    pub fn new(mappings: Vec<FieldMapping>) -> Result<Self> {
        let table = Self {
            name: None,
            version: None,
            mappings,
        };
        table.validate()?;
        Ok(table)
    }

    /// Parse and validate a table from YAML
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let table: MappingTable = serde_yaml::from_str(yaml)?;
        table.validate()?;
        Ok(table)
    }

    /// Check the table invariants
    ///
    /// Source names and target names must each be unique and non-empty.
    pub fn validate(&self) -> Result<()> {
        if self.mappings.is_empty() {
            return Err(Error::invalid_config("mappings", "mapping table is empty"));
        }

        let mut sources = HashSet::new();
        let mut targets = HashSet::new();
        for (idx, mapping) in self.mappings.iter().enumerate() {
            if mapping.source_name.trim().is_empty() || mapping.target_name.trim().is_empty() {
                return Err(Error::invalid_config(
                    "mappings",
                    format!("mapping {idx} has an empty field name"),
                ));
            }
            if !sources.insert(mapping.source_name.as_str()) {
                return Err(Error::invalid_config(
                    "mappings",
                    format!("duplicate source field '{}'", mapping.source_name),
                ));
            }
            if !targets.insert(mapping.target_name.as_str()) {
                return Err(Error::invalid_config(
                    "mappings",
                    format!("duplicate target field '{}'", mapping.target_name),
                ));
            }
        }
        Ok(())
    }

    /// Arrow schema of the mapped output, in table order
    pub fn target_schema(&self) -> Schema {
        let fields: Vec<Field> = self
            .mappings
            .iter()
            .map(|m| Field::new(&m.target_name, m.target_type.to_arrow(), true))
            .collect();
        Schema::new(fields)
    }

    /// Look up the mapping for a target field
    pub fn target(&self, name: &str) -> Option<&FieldMapping> {
        self.mappings.iter().find(|m| m.target_name == name)
    }

    /// Look up the mapping for a source field
    pub fn source(&self, name: &str) -> Option<&FieldMapping> {
        self.mappings.iter().find(|m| m.source_name == name)
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }
}
