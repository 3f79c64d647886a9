//! In-memory store with injectable failures and latency, for tests

use async_trait::async_trait;
use futures::stream::BoxStream;
use object_store::memory::InMemory;
use object_store::path::Path;
use object_store::{
    GetOptions, GetResult, ListResult, MultipartUpload, ObjectMeta, ObjectStore, PutMultipartOpts,
    PutOptions, PutPayload, PutResult,
};
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Wraps `InMemory`; puts to matching paths fail, gets and puts can be slowed
#[derive(Debug, Default)]
pub(crate) struct FaultyStore {
    inner: Arc<InMemory>,
    failing_suffixes: Mutex<Vec<String>>,
    delay: Mutex<Option<Duration>>,
    put_delays: Mutex<Vec<(String, Duration)>>,
}

impl FaultyStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// A second view of the same data with its own faults
    pub(crate) fn sharing(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            ..Self::default()
        }
    }

    /// Fail every later put whose path ends with `suffix`
    pub(crate) fn fail_puts_ending_with(&self, suffix: &str) {
        self.failing_suffixes.lock().unwrap().push(suffix.to_string());
    }

    /// Sleep this long before every later get and put
    pub(crate) fn delay_by(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    /// Sleep this long before every later put whose path ends with `suffix`
    pub(crate) fn delay_puts_ending_with(&self, suffix: &str, delay: Duration) {
        self.put_delays
            .lock()
            .unwrap()
            .push((suffix.to_string(), delay));
    }

    async fn pause(&self) {
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }

    async fn pause_put(&self, location: &Path) {
        let path = location.as_ref();
        let delay = self
            .put_delays
            .lock()
            .unwrap()
            .iter()
            .filter(|(suffix, _)| path.ends_with(suffix.as_str()))
            .map(|(_, delay)| *delay)
            .max();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }

    fn check_put(&self, location: &Path) -> object_store::Result<()> {
        let path = location.as_ref();
        let failing = self
            .failing_suffixes
            .lock()
            .unwrap()
            .iter()
            .any(|suffix| path.ends_with(suffix.as_str()));
        if failing {
            return Err(object_store::Error::Generic {
                store: "faulty",
                source: format!("injected put failure for {path}").into(),
            });
        }
        Ok(())
    }
}

impl fmt::Display for FaultyStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FaultyStore({})", self.inner)
    }
}

#[async_trait]
impl ObjectStore for FaultyStore {
    async fn put_opts(
        &self,
        location: &Path,
        payload: PutPayload,
        opts: PutOptions,
    ) -> object_store::Result<PutResult> {
        self.pause().await;
        self.pause_put(location).await;
        self.check_put(location)?;
        self.inner.put_opts(location, payload, opts).await
    }

    async fn put_multipart_opts(
        &self,
        location: &Path,
        opts: PutMultipartOpts,
    ) -> object_store::Result<Box<dyn MultipartUpload>> {
        self.check_put(location)?;
        self.inner.put_multipart_opts(location, opts).await
    }

    async fn get_opts(
        &self,
        location: &Path,
        options: GetOptions,
    ) -> object_store::Result<GetResult> {
        self.pause().await;
        self.inner.get_opts(location, options).await
    }

    async fn delete(&self, location: &Path) -> object_store::Result<()> {
        self.inner.delete(location).await
    }

    fn list(&self, prefix: Option<&Path>) -> BoxStream<'_, object_store::Result<ObjectMeta>> {
        self.inner.list(prefix)
    }

    async fn list_with_delimiter(&self, prefix: Option<&Path>) -> object_store::Result<ListResult> {
        self.inner.list_with_delimiter(prefix).await
    }

    async fn copy(&self, from: &Path, to: &Path) -> object_store::Result<()> {
        self.inner.copy(from, to).await
    }

    async fn copy_if_not_exists(&self, from: &Path, to: &Path) -> object_store::Result<()> {
        self.inner.copy_if_not_exists(from, to).await
    }
}
