//! Built-in mapping tables embedded in the binary
//!
//! Lets the batch job refer to `mapping: raw_statistics` instead of a path.

use super::types::MappingTable;
use crate::error::{Error, Result};
use std::collections::HashMap;
use std::path::Path;
use std::sync::LazyLock;

/// Built-in mapping table YAML definitions
pub static BUILTIN_MAPPINGS: LazyLock<HashMap<&'static str, &'static str>> =
    LazyLock::new(|| {
        let mut m = HashMap::new();
        m.insert(
            "raw_statistics",
            include_str!("../../mappings/raw_statistics.yaml"),
        );
        m
    });

/// Get a built-in mapping table YAML by name
pub fn get_builtin(name: &str) -> Option<&'static str> {
    BUILTIN_MAPPINGS.get(name).copied()
}

/// List built-in mapping table names
pub fn list_builtin() -> Vec<&'static str> {
    let mut names: Vec<_> = BUILTIN_MAPPINGS.keys().copied().collect();
    names.sort_unstable();
    names
}

/// Load a mapping table from a built-in name or a YAML file path
pub fn load_mapping(name_or_path: impl AsRef<Path>) -> Result<MappingTable> {
    let path = name_or_path.as_ref();
    let path_str = path.to_string_lossy();

    if !path_str.contains('/')
        && !path_str.contains('\\')
        && !path_str.ends_with(".yaml")
        && !path_str.ends_with(".yml")
    {
        if let Some(yaml) = get_builtin(&path_str) {
            return MappingTable::from_yaml_str(yaml);
        }
    }

    let content = std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::config(format!(
                "Mapping table '{}' not found. Built-in tables: {}. Or provide a path to a YAML file.",
                path.display(),
                list_builtin().join(", ")
            ))
        } else {
            Error::config(format!(
                "Failed to read mapping table '{}': {e}",
                path.display()
            ))
        }
    })?;
    MappingTable::from_yaml_str(&content)
}
