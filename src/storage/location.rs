//! Object storage locations (S3, R2, GCS, Azure, memory, local)

use crate::error::{Error, Result};
use bytes::Bytes;
use futures::TryStreamExt;
use object_store::aws::AmazonS3Builder;
use object_store::azure::MicrosoftAzureBuilder;
use object_store::gcp::GoogleCloudStorageBuilder;
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::path::Path as ObjectPath;
use object_store::ObjectStore;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, LazyLock, Mutex, PoisonError};
use std::time::Duration;

/// Default bound on a single storage call
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Named in-memory stores shared across `memory://` locations in a process
static MEMORY_STORES: LazyLock<Mutex<HashMap<String, Arc<InMemory>>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

/// Which side of the pipeline a location serves
///
/// Failures are reported as `SourceUnavailable` for reads and
/// `WriteTargetUnavailable` for writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
}

/// A file found under a location
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectEntry {
    /// Path relative to the location root
    pub path: String,
    pub size: usize,
}

/// One level of a directory-style listing
#[derive(Debug, Clone, Default)]
pub struct Listing {
    /// Child directories, relative to the location root
    pub dirs: Vec<String>,
    /// Files directly inside the listed directory
    pub files: Vec<ObjectEntry>,
}

/// A root path inside an object store
#[derive(Debug, Clone)]
pub struct StorageLocation {
    store: Arc<dyn ObjectStore>,
    /// Display URL of the root, without trailing slash
    url: String,
    /// Path of the root inside the store, without surrounding slashes
    prefix: String,
    timeout: Duration,
    access: Access,
}

impl StorageLocation {
    /// Parse a location URL and create the matching object store
    ///
    /// Supported formats:
    /// - `s3://bucket/path/` - AWS S3
    /// - `r2://bucket/path/` - Cloudflare R2 (S3-compatible)
    /// - `gs://bucket/path/` - Google Cloud Storage
    /// - `az://container/path/` - Azure Blob Storage
    /// - `memory://name/path/` - process-local in-memory store
    /// - `/local/path/`, `./path/` or `file:///path/` - Local filesystem
    pub fn parse(url: &str, access: Access) -> Result<Self> {
        let fail = |message: String| match access {
            Access::Read => Error::source_unavailable(url, message),
            Access::Write => Error::write_target(url, message),
        };

        let (scheme, rest) = match url.split_once("://") {
            Some((scheme, rest)) if scheme != "file" => (scheme, rest),
            _ => return Self::parse_local(url, access),
        };

        let (bucket, prefix) = split_bucket(rest);
        if bucket.is_empty() {
            return Err(fail(format!("missing bucket in '{url}'")));
        }

        let store: Arc<dyn ObjectStore> = match scheme {
            "s3" | "s3a" | "r2" => {
                let mut builder = AmazonS3Builder::from_env().with_bucket_name(bucket);
                // AWS_ENDPOINT is read by from_env(); R2 may also set its own variable
                if scheme == "r2" {
                    if let Ok(endpoint) = std::env::var("R2_ENDPOINT_URL") {
                        builder = builder.with_endpoint(endpoint);
                    }
                }
                Arc::new(
                    builder
                        .build()
                        .map_err(|e| fail(format!("Failed to create {scheme} client: {e}")))?,
                )
            }
            "gs" => Arc::new(
                GoogleCloudStorageBuilder::from_env()
                    .with_bucket_name(bucket)
                    .build()
                    .map_err(|e| fail(format!("Failed to create GCS client: {e}")))?,
            ),
            "az" => Arc::new(
                MicrosoftAzureBuilder::from_env()
                    .with_container_name(bucket)
                    .build()
                    .map_err(|e| fail(format!("Failed to create Azure client: {e}")))?,
            ),
            "memory" => memory_store(bucket),
            other => return Err(fail(format!("unsupported storage scheme '{other}'"))),
        };

        let url = if prefix.is_empty() {
            format!("{scheme}://{bucket}")
        } else {
            format!("{scheme}://{bucket}/{prefix}")
        };

        Ok(Self {
            store,
            url,
            prefix,
            timeout: DEFAULT_TIMEOUT,
            access,
        })
    }

    /// Parse local filesystem path
    ///
    /// Write locations are created on demand; a missing read location is
    /// unavailable.
    fn parse_local(url: &str, access: Access) -> Result<Self> {
        let path = url.strip_prefix("file://").unwrap_or(url);
        let path = path.trim_end_matches('/');
        let path = if path.is_empty() { "/" } else { path };

        match access {
            Access::Write => std::fs::create_dir_all(path)
                .map_err(|e| Error::write_target(url, format!("Failed to create directory: {e}")))?,
            Access::Read if !std::path::Path::new(path).is_dir() => {
                return Err(Error::source_unavailable(url, "directory does not exist"))
            }
            Access::Read => {}
        }

        let store = LocalFileSystem::new_with_prefix(path).map_err(|e| match access {
            Access::Read => Error::source_unavailable(url, e.to_string()),
            Access::Write => Error::write_target(url, e.to_string()),
        })?;

        Ok(Self {
            store: Arc::new(store),
            url: path.to_string(),
            prefix: String::new(),
            timeout: DEFAULT_TIMEOUT,
            access,
        })
    }

    /// Wrap an existing store
    pub fn from_store(
        store: Arc<dyn ObjectStore>,
        url: impl Into<String>,
        prefix: impl Into<String>,
        access: Access,
    ) -> Self {
        Self {
            store,
            url: url.into().trim_end_matches('/').to_string(),
            prefix: prefix.into().trim_matches('/').to_string(),
            timeout: DEFAULT_TIMEOUT,
            access,
        }
    }

    /// Set the per-call timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Change which side of the pipeline this location reports errors for
    #[must_use]
    pub fn with_access(mut self, access: Access) -> Self {
        self.access = access;
        self
    }

    /// A location rooted at a sub-path of this one
    pub fn child(&self, relative: &str) -> Self {
        let relative = relative.trim_matches('/');
        if relative.is_empty() {
            return self.clone();
        }
        Self {
            store: Arc::clone(&self.store),
            url: format!("{}/{relative}", self.url),
            prefix: join(&self.prefix, relative),
            timeout: self.timeout,
            access: self.access,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn access(&self) -> Access {
        self.access
    }

    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    /// Display URL of a path relative to this location
    pub fn full_url(&self, relative: &str) -> String {
        let relative = relative.trim_matches('/');
        if relative.is_empty() {
            self.url.clone()
        } else {
            format!("{}/{relative}", self.url)
        }
    }

    fn fail(&self, relative: &str, message: impl Into<String>) -> Error {
        let target = self.full_url(relative);
        match self.access {
            Access::Read => Error::source_unavailable(target, message),
            Access::Write => Error::write_target(target, message),
        }
    }

    fn object_path(&self, relative: &str) -> Result<ObjectPath> {
        let full = join(&self.prefix, relative.trim_matches('/'));
        ObjectPath::parse(&full).map_err(|e| self.fail(relative, format!("invalid path: {e}")))
    }

    fn relative_of(&self, path: &ObjectPath) -> String {
        let raw: &str = path.as_ref();
        if self.prefix.is_empty() {
            raw.to_string()
        } else {
            raw.strip_prefix(&self.prefix)
                .map_or(raw, |rest| rest.trim_start_matches('/'))
                .to_string()
        }
    }

    /// Run a store call under the location's timeout
    async fn timed<T, F>(&self, op: &str, relative: &str, fut: F) -> Result<object_store::Result<T>>
    where
        F: Future<Output = object_store::Result<T>>,
    {
        tokio::time::timeout(self.timeout, fut).await.map_err(|_| {
            self.fail(
                relative,
                format!("{op} timed out after {}s", self.timeout.as_secs_f64()),
            )
        })
    }

    /// Read an object
    pub async fn get(&self, relative: &str) -> Result<Bytes> {
        self.get_opt(relative)
            .await?
            .ok_or_else(|| self.fail(relative, "object not found"))
    }

    /// Read an object, `None` when it does not exist
    pub async fn get_opt(&self, relative: &str) -> Result<Option<Bytes>> {
        let path = self.object_path(relative)?;
        let store = &self.store;
        let result = self
            .timed("get", relative, async {
                store.get(&path).await?.bytes().await
            })
            .await?;

        match result {
            Ok(bytes) => Ok(Some(bytes)),
            Err(object_store::Error::NotFound { .. }) => Ok(None),
            Err(e) => Err(self.fail(relative, format!("get failed: {e}"))),
        }
    }

    /// Write an object, replacing any existing one
    pub async fn put(&self, relative: &str, data: Bytes) -> Result<()> {
        let path = self.object_path(relative)?;
        self.timed("put", relative, self.store.put(&path, data.into()))
            .await?
            .map_err(|e| self.fail(relative, format!("put failed: {e}")))?;
        Ok(())
    }

    /// Delete an object; deleting a missing object succeeds
    pub async fn delete(&self, relative: &str) -> Result<()> {
        let path = self.object_path(relative)?;
        match self.timed("delete", relative, self.store.delete(&path)).await? {
            Ok(()) | Err(object_store::Error::NotFound { .. }) => Ok(()),
            Err(e) => Err(self.fail(relative, format!("delete failed: {e}"))),
        }
    }

    /// Whether an object exists
    pub async fn exists(&self, relative: &str) -> Result<bool> {
        let path = self.object_path(relative)?;
        match self.timed("head", relative, self.store.head(&path)).await? {
            Ok(_) => Ok(true),
            Err(object_store::Error::NotFound { .. }) => Ok(false),
            Err(e) => Err(self.fail(relative, format!("head failed: {e}"))),
        }
    }

    /// Recursively list every object under a relative directory
    pub async fn list(&self, relative: &str) -> Result<Vec<ObjectEntry>> {
        let prefix = self.list_prefix(relative)?;
        let store = &self.store;
        let metas = self
            .timed("list", relative, async {
                store.list(prefix.as_ref()).try_collect::<Vec<_>>().await
            })
            .await?
            .map_err(|e| self.fail(relative, format!("list failed: {e}")))?;

        let mut entries: Vec<ObjectEntry> = metas
            .into_iter()
            .map(|meta| ObjectEntry {
                path: self.relative_of(&meta.location),
                size: meta.size,
            })
            .collect();
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(entries)
    }

    /// List one directory level under a relative directory
    pub async fn list_level(&self, relative: &str) -> Result<Listing> {
        let prefix = self.list_prefix(relative)?;
        let result = self
            .timed(
                "list",
                relative,
                self.store.list_with_delimiter(prefix.as_ref()),
            )
            .await?
            .map_err(|e| self.fail(relative, format!("list failed: {e}")))?;

        let mut listing = Listing {
            dirs: result
                .common_prefixes
                .iter()
                .map(|p| self.relative_of(p))
                .collect(),
            files: result
                .objects
                .iter()
                .map(|meta| ObjectEntry {
                    path: self.relative_of(&meta.location),
                    size: meta.size,
                })
                .collect(),
        };
        listing.dirs.sort();
        listing.files.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(listing)
    }

    fn list_prefix(&self, relative: &str) -> Result<Option<ObjectPath>> {
        let full = join(&self.prefix, relative.trim_matches('/'));
        if full.is_empty() {
            Ok(None)
        } else {
            self.object_path(relative).map(Some)
        }
    }
}

fn split_bucket(rest: &str) -> (&str, String) {
    match rest.split_once('/') {
        Some((bucket, prefix)) => (bucket, prefix.trim_matches('/').to_string()),
        None => (rest, String::new()),
    }
}

fn join(prefix: &str, relative: &str) -> String {
    match (prefix.is_empty(), relative.is_empty()) {
        (true, _) => relative.to_string(),
        (false, true) => prefix.to_string(),
        (false, false) => format!("{prefix}/{relative}"),
    }
}

fn memory_store(name: &str) -> Arc<dyn ObjectStore> {
    let mut stores = MEMORY_STORES.lock().unwrap_or_else(PoisonError::into_inner);
    let store = stores
        .entry(name.to_string())
        .or_insert_with(|| Arc::new(InMemory::new()));
    Arc::clone(store) as Arc<dyn ObjectStore>
}
