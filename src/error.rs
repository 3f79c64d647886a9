//! Error types for the ingestion pipeline
//!
//! This module defines the error hierarchy for the whole crate.
//! All public APIs return `Result<T, Error>` where Error is defined here.

use thiserror::Error;

/// The main error type for the ingestion pipeline
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Missing required config field: {field}")]
    MissingConfigField { field: String },

    #[error("Invalid config value for '{field}': {message}")]
    InvalidConfigValue { field: String, message: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    // ============================================================================
    // Extraction Errors
    // ============================================================================
    #[error("Source unavailable '{source_id}': {message}")]
    SourceUnavailable { source_id: String, message: String },

    #[error("Invalid predicate '{predicate}': {message}")]
    InvalidPredicate { predicate: String, message: String },

    #[error("Failed to decode '{path}': {message}")]
    Decode { path: String, message: String },

    // ============================================================================
    // Normalization Errors
    // ============================================================================
    #[error("Schema mismatch: {message}")]
    SchemaMismatch { message: String },

    #[error("Record {record}: missing field '{field}'")]
    MissingField { record: usize, field: String },

    #[error("Record {record}: cannot coerce field '{field}' from {from} to {to}: {message}")]
    TypeCoercion {
        record: usize,
        field: String,
        from: String,
        to: String,
        message: String,
    },

    // ============================================================================
    // Write Errors
    // ============================================================================
    #[error("Record {record}: missing value for partition key '{key}'")]
    PartitionKeyMissing { record: usize, key: String },

    #[error("Write target unavailable '{target}': {message}")]
    WriteTargetUnavailable { target: String, message: String },

    #[error("Catalog registration failed for {database}.{table}: {message}")]
    CatalogRegistrationFailed {
        database: String,
        table: String,
        message: String,
    },

    // ============================================================================
    // Arrow/Parquet/Storage Errors
    // ============================================================================
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("Object store error: {0}")]
    ObjectStore(#[from] object_store::Error),

    #[error("Output error: {message}")]
    Output { message: String },

    // ============================================================================
    // I/O Errors
    // ============================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ============================================================================
    // Generic Errors
    // ============================================================================
    #[error("{0}")]
    Other(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

/// Stable classification of an [`Error`], used in logs and result descriptors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Config,
    SourceUnavailable,
    InvalidPredicate,
    SchemaMismatch,
    MissingField,
    TypeCoercion,
    PartitionKeyMissing,
    WriteTargetUnavailable,
    CatalogRegistrationFailed,
    Internal,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::Config => "config",
            ErrorKind::SourceUnavailable => "source_unavailable",
            ErrorKind::InvalidPredicate => "invalid_predicate",
            ErrorKind::SchemaMismatch => "schema_mismatch",
            ErrorKind::MissingField => "missing_field",
            ErrorKind::TypeCoercion => "type_coercion",
            ErrorKind::PartitionKeyMissing => "partition_key_missing",
            ErrorKind::WriteTargetUnavailable => "write_target_unavailable",
            ErrorKind::CatalogRegistrationFailed => "catalog_registration_failed",
            ErrorKind::Internal => "internal",
        };
        f.write_str(name)
    }
}

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a missing field error
    pub fn missing_config_field(field: impl Into<String>) -> Self {
        Self::MissingConfigField {
            field: field.into(),
        }
    }

    /// Create an invalid config value error
    pub fn invalid_config(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfigValue {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a source unavailable error
    pub fn source_unavailable(source_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SourceUnavailable {
            source_id: source_id.into(),
            message: message.into(),
        }
    }

    /// Create an invalid predicate error
    pub fn invalid_predicate(predicate: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidPredicate {
            predicate: predicate.into(),
            message: message.into(),
        }
    }

    /// Create a decode error
    pub fn decode(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a schema mismatch error
    pub fn schema_mismatch(message: impl Into<String>) -> Self {
        Self::SchemaMismatch {
            message: message.into(),
        }
    }

    /// Create a write target error
    pub fn write_target(target: impl Into<String>, message: impl Into<String>) -> Self {
        Self::WriteTargetUnavailable {
            target: target.into(),
            message: message.into(),
        }
    }

    /// Create an output error
    pub fn output(message: impl Into<String>) -> Self {
        Self::Output {
            message: message.into(),
        }
    }

    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Config { .. }
            | Error::MissingConfigField { .. }
            | Error::InvalidConfigValue { .. }
            | Error::YamlParse(_) => ErrorKind::Config,
            Error::SourceUnavailable { .. } => ErrorKind::SourceUnavailable,
            Error::InvalidPredicate { .. } => ErrorKind::InvalidPredicate,
            Error::SchemaMismatch { .. } | Error::Decode { .. } | Error::JsonParse(_) => {
                ErrorKind::SchemaMismatch
            }
            Error::MissingField { .. } => ErrorKind::MissingField,
            Error::TypeCoercion { .. } => ErrorKind::TypeCoercion,
            Error::PartitionKeyMissing { .. } => ErrorKind::PartitionKeyMissing,
            Error::WriteTargetUnavailable { .. } => ErrorKind::WriteTargetUnavailable,
            Error::CatalogRegistrationFailed { .. } => ErrorKind::CatalogRegistrationFailed,
            _ => ErrorKind::Internal,
        }
    }

    /// Whether this error aborts the current invocation
    ///
    /// Catalog registration is the only step whose failure leaves a
    /// successful data write in place.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Error::CatalogRegistrationFailed { .. })
    }

    /// Whether this error is scoped to a single record
    pub fn is_record_level(&self) -> bool {
        matches!(
            self,
            Error::MissingField { .. }
                | Error::TypeCoercion { .. }
                | Error::PartitionKeyMissing { .. }
        )
    }
}

/// Result type alias for the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, message: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", message.into(), inner))
        })
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", f(), inner))
        })
    }
}
