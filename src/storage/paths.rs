//! Hive-style partition paths
//!
//! Partition directories are named `key=value`. Values are escaped the way
//! Hive escapes path names, so any string round-trips through a directory
//! name.

use std::collections::BTreeMap;
use std::fmt::Write as _;

/// Characters that may not appear literally in a partition value
fn needs_escape(c: char) -> bool {
    c.is_ascii_control()
        || matches!(
            c,
            '"' | '#' | '%' | '\'' | '*' | '/' | ':' | '=' | '?' | '\\' | '{' | '[' | ']' | '^'
        )
}

/// Escape a partition key or value for use in a directory name
pub fn escape_partition_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if needs_escape(c) {
            // needs_escape only matches ASCII
            let _ = write!(out, "%{:02X}", c as u32);
        } else {
            out.push(c);
        }
    }
    out
}

/// Reverse [`escape_partition_value`]; malformed escapes are kept as-is
pub fn unescape_partition_value(value: &str) -> String {
    let bytes = value.as_bytes();
    let mut out: Vec<u8> = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let decoded = std::str::from_utf8(&bytes[i + 1..i + 3])
                .ok()
                .and_then(|hex| u8::from_str_radix(hex, 16).ok());
            if let Some(b) = decoded {
                out.push(b);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Directory for one combination of partition values, e.g. `region=us`
pub fn partition_dir(values: &[(String, String)]) -> String {
    values
        .iter()
        .map(|(k, v)| {
            format!(
                "{}={}",
                escape_partition_value(k),
                escape_partition_value(v)
            )
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Parse one `key=value` directory segment
pub fn parse_partition_segment(segment: &str) -> Option<(String, String)> {
    let (key, value) = segment.split_once('=')?;
    if key.is_empty() {
        return None;
    }
    Some((unescape_partition_value(key), unescape_partition_value(value)))
}

/// Partition values encoded in the directory part of a relative file path
pub fn parse_partition_path(path: &str) -> BTreeMap<String, String> {
    let mut segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    // Last segment is the file name
    segments.pop();
    segments
        .into_iter()
        .filter_map(parse_partition_segment)
        .collect()
}

/// Whether any segment of the path is hidden (`_` or `.` prefix)
///
/// Hidden paths hold commit markers, manifests and staging data and are
/// never read as data.
pub fn is_hidden_path(path: &str) -> bool {
    path.split('/')
        .any(|s| s.starts_with('_') || s.starts_with('.'))
}
