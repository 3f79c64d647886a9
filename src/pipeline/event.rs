//! Per-object event handler
//!
//! Each event names one newly arrived JSON object. The handler reads it,
//! flattens its `items` array into rows and writes them to the configured
//! dataset with catalog registration. Errors are logged with the bucket and
//! key, then returned unchanged; retrying is the caller's business.

use crate::catalog::Catalog;
use crate::config::{EventHandlerConfig, StorageConfig};
use crate::error::{Error, Result};
use crate::flatten::Flattener;
use crate::output::{PartitionedWriter, WriteOptions, WriteResult};
use crate::storage::{Access, StorageLocation};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

// ============================================================================
// Object Event
// ============================================================================

/// A newly arrived object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectEvent {
    pub bucket: String,
    /// Decoded object key
    pub key: String,
}

/// Accepted event payloads
#[derive(Deserialize)]
#[serde(untagged)]
enum EventPayload {
    Direct {
        bucket: String,
        key: String,
    },
    Notification {
        #[serde(rename = "Records")]
        records: Vec<NotificationRecord>,
    },
}

#[derive(Deserialize)]
struct NotificationRecord {
    s3: NotificationEntity,
}

#[derive(Deserialize)]
struct NotificationEntity {
    bucket: Named,
    object: Keyed,
}

#[derive(Deserialize)]
struct Named {
    name: String,
}

#[derive(Deserialize)]
struct Keyed {
    key: String,
}

impl ObjectEvent {
    /// Event for an already decoded key
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    /// Parse `{bucket, key}` or a storage notification
    ///
    /// Only the first notification record is used. Notification keys arrive
    /// form-encoded and are decoded here.
    pub fn from_json(value: &Value) -> Result<Self> {
        let payload: EventPayload = serde_json::from_value(value.clone()).map_err(|e| {
            Error::source_unavailable("event", format!("unrecognized event payload: {e}"))
        })?;

        let (bucket, key) = match payload {
            // Direct events carry the key already decoded
            EventPayload::Direct { bucket, key } => (bucket, key),
            EventPayload::Notification { records } => {
                let record = records.into_iter().next().ok_or_else(|| {
                    Error::source_unavailable("event", "notification has no records")
                })?;
                (record.s3.bucket.name, decode_object_key(&record.s3.object.key))
            }
        };

        if bucket.is_empty() || key.is_empty() {
            return Err(Error::source_unavailable(
                "event",
                "event bucket and key must not be empty",
            ));
        }

        Ok(Self::new(bucket, key))
    }

    /// `s3://bucket/key`
    pub fn url(&self) -> String {
        format!("s3://{}/{}", self.bucket, self.key)
    }
}

/// Decode a form-encoded object key: `+` is a space, `%XX` an escaped byte
pub fn decode_object_key(raw: &str) -> String {
    let encoded = format!("k={}", raw.replace('&', "%26"));
    url::form_urlencoded::parse(encoded.as_bytes())
        .next()
        .map_or_else(|| raw.to_string(), |(_, v)| v.into_owned())
}

// ============================================================================
// Handler
// ============================================================================

/// Handles object events with a fixed configuration
#[derive(Debug, Clone)]
pub struct EventHandler {
    flattener: Flattener,
    writer: PartitionedWriter,
    options: WriteOptions,
    /// Reads every event from this location instead of the event's bucket
    source: Option<StorageLocation>,
    timeout: Duration,
}

impl EventHandler {
    /// Build a handler; configuration errors surface here, before any I/O
    pub fn new(
        config: &EventHandlerConfig,
        catalog: Arc<dyn Catalog>,
        storage: &StorageConfig,
    ) -> Result<Self> {
        config.validate()?;

        let target = StorageLocation::parse(&config.target_path, Access::Write)?
            .with_timeout(storage.timeout());

        Ok(Self {
            flattener: Flattener::new()
                .with_items_field(&config.items_field)
                .with_separator(&config.separator),
            writer: PartitionedWriter::new(target).with_catalog(catalog),
            options: config.write_options(),
            source: None,
            timeout: storage.timeout(),
        })
    }

    /// Read objects from `location` by key, ignoring the event bucket
    #[must_use]
    pub fn with_source(mut self, location: StorageLocation) -> Self {
        self.source = Some(location.with_access(Access::Read));
        self
    }

    /// Handle a raw event payload
    pub async fn handle_json(&self, event: &Value) -> Result<WriteResult> {
        let event = ObjectEvent::from_json(event).inspect_err(|e| {
            error!(error = %e, "Rejected event");
        })?;
        self.handle(&event).await
    }

    /// Handle one object event
    pub async fn handle(&self, event: &ObjectEvent) -> Result<WriteResult> {
        match self.process(event).await {
            Ok(result) => {
                info!(
                    bucket = %event.bucket,
                    key = %event.key,
                    rows = result.rows_written,
                    files = result.paths.len(),
                    catalog_registered = result.catalog.as_ref().is_some_and(|c| c.registered),
                    "Object processed"
                );
                Ok(result)
            }
            Err(e) => {
                error!(
                    bucket = %event.bucket,
                    key = %event.key,
                    kind = %e.kind(),
                    error = %e,
                    "Failed to process object; check that it exists and is readable"
                );
                Err(e)
            }
        }
    }

    async fn process(&self, event: &ObjectEvent) -> Result<WriteResult> {
        let body = match &self.source {
            Some(source) => source.get(&event.key).await?,
            None => {
                let bucket = StorageLocation::parse(&format!("s3://{}", event.bucket), Access::Read)?
                    .with_timeout(self.timeout);
                bucket.get(&event.key).await?
            }
        };

        let rows = self.flattener.flatten_bytes(&body).map_err(|e| match e {
            Error::SchemaMismatch { message } => {
                Error::schema_mismatch(format!("{}: {message}", event.url()))
            }
            other => other,
        })?;

        self.writer.write(&rows, &self.options).await
    }
}
