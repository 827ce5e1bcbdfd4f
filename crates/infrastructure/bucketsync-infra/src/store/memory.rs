//! Process-local object store with failure injection and call accounting.

use super::{commit_partial, partial_path, ObjectStore, StoreError};
use bucketsync_core::path_utils::BucketPath;
use bucketsync_core::{ObjectMeta, RemoteObject};
use camino::Utf8Path;
use futures::stream::{self, BoxStream, StreamExt};
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    List,
    Head,
    Get,
    Put,
}

#[derive(Default)]
pub struct MemoryObjectStore {
    objects: Mutex<BTreeMap<String, Vec<u8>>>,
    failures: Mutex<HashSet<(StoreOp, String)>>,
    latency: Option<Duration>,
    puts: AtomicU64,
    gets: AtomicU64,
    heads: AtomicU64,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

struct InFlight<'a>(&'a MemoryObjectStore);

impl<'a> InFlight<'a> {
    fn enter(store: &'a MemoryObjectStore) -> Self {
        let now = store.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        store.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        Self(store)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every get/put sleeps this long, so concurrent transfers overlap.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn insert(&self, key: impl Into<String>, data: impl Into<Vec<u8>>) {
        self.objects
            .lock()
            .expect("store lock")
            .insert(key.into(), data.into());
    }

    pub fn object(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.lock().expect("store lock").get(key).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        self.objects
            .lock()
            .expect("store lock")
            .keys()
            .cloned()
            .collect()
    }

    /// Make `op` on `key` fail with `StoreError::Unavailable`.
    /// For `StoreOp::List` the key is the listing prefix.
    pub fn fail_on(&self, op: StoreOp, key: impl Into<String>) {
        self.failures
            .lock()
            .expect("store lock")
            .insert((op, key.into()));
    }

    pub fn put_count(&self) -> u64 {
        self.puts.load(Ordering::SeqCst)
    }

    pub fn get_count(&self) -> u64 {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn head_count(&self) -> u64 {
        self.heads.load(Ordering::SeqCst)
    }

    /// Highest number of get/put calls observed running at once.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    fn check(&self, op: StoreOp, key: &str) -> Result<(), StoreError> {
        if self
            .failures
            .lock()
            .expect("store lock")
            .contains(&(op, key.to_string()))
        {
            return Err(StoreError::Unavailable(format!(
                "injected {op:?} failure for {key}"
            )));
        }
        Ok(())
    }

    async fn delay(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }
}

fn etag_for(data: &[u8]) -> String {
    format!("\"{:x}\"", md5::compute(data))
}

#[async_trait::async_trait]
impl ObjectStore for MemoryObjectStore {
    fn list<'a>(&'a self, prefix: &'a str) -> BoxStream<'a, Result<RemoteObject, StoreError>> {
        if let Err(e) = self.check(StoreOp::List, prefix) {
            return stream::once(async move { Err(e) }).boxed();
        }

        let listed: Vec<Result<RemoteObject, StoreError>> = self
            .objects
            .lock()
            .expect("store lock")
            .iter()
            .filter(|(key, _)| key.starts_with(prefix) && !BucketPath::is_placeholder(key))
            .map(|(key, data)| {
                Ok(RemoteObject {
                    key: key.clone(),
                    size: data.len() as u64,
                    etag: Some(etag_for(data)),
                })
            })
            .collect();

        stream::iter(listed).boxed()
    }

    async fn head(&self, key: &str) -> Result<Option<ObjectMeta>, StoreError> {
        self.heads.fetch_add(1, Ordering::SeqCst);
        self.check(StoreOp::Head, key)?;
        Ok(self
            .objects
            .lock()
            .expect("store lock")
            .get(key)
            .map(|data| ObjectMeta {
                size: data.len() as u64,
                etag: Some(etag_for(data)),
            }))
    }

    async fn get(&self, key: &str, dest: &Utf8Path) -> Result<u64, StoreError> {
        let _guard = InFlight::enter(self);
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.delay().await;
        self.check(StoreOp::Get, key)?;

        let data = self
            .object(key)
            .ok_or_else(|| StoreError::Unavailable(format!("no such key: {key}")))?;

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::io(parent, e))?;
        }
        let tmp = partial_path(dest);
        tokio::fs::write(&tmp, &data)
            .await
            .map_err(|e| StoreError::io(&tmp, e))?;
        commit_partial(&tmp, dest).await?;
        Ok(data.len() as u64)
    }

    async fn put(&self, key: &str, source: &Utf8Path) -> Result<u64, StoreError> {
        let _guard = InFlight::enter(self);
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.delay().await;
        self.check(StoreOp::Put, key)?;

        let data = tokio::fs::read(source)
            .await
            .map_err(|e| StoreError::io(source, e))?;
        let len = data.len() as u64;
        self.insert(key, data);
        Ok(len)
    }
}
