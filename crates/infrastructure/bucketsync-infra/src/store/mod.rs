use bucketsync_core::{ObjectMeta, RemoteObject};
use camino::Utf8Path;
use futures::stream::BoxStream;
use thiserror::Error;

pub mod memory;
pub mod s3;

pub use memory::MemoryObjectStore;
pub use s3::{S3Config, S3ObjectStore};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("object store unavailable: {0}")]
    Unavailable(String),
    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl StoreError {
    pub(crate) fn io(path: &Utf8Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_string(),
            source,
        }
    }
}

/// Remote side of a sync: list, probe, fetch and store objects by key.
///
/// Implementations must be safe to share across concurrent transfers.
#[async_trait::async_trait]
pub trait ObjectStore: Send + Sync {
    /// Objects whose key starts with `prefix`, excluding `/`-terminated placeholders.
    fn list<'a>(&'a self, prefix: &'a str) -> BoxStream<'a, Result<RemoteObject, StoreError>>;

    /// Metadata for `key`, or `None` when the key does not exist.
    async fn head(&self, key: &str) -> Result<Option<ObjectMeta>, StoreError>;

    /// Stream the object at `key` into `dest`, creating parent directories.
    async fn get(&self, key: &str, dest: &Utf8Path) -> Result<u64, StoreError>;

    /// Stream `source` to `key`, replacing any existing object.
    async fn put(&self, key: &str, source: &Utf8Path) -> Result<u64, StoreError>;

    async fn head_size(&self, key: &str) -> Result<Option<u64>, StoreError> {
        Ok(self.head(key).await?.map(|m| m.size))
    }
}

/// Temporary sibling used while a download is in flight.
pub(crate) fn partial_path(dest: &Utf8Path) -> camino::Utf8PathBuf {
    let name = dest.file_name().unwrap_or("download");
    dest.with_file_name(format!("{name}.part"))
}

/// Move a finished `.part` file into place, removing it if the move fails.
pub(crate) async fn commit_partial(tmp: &Utf8Path, dest: &Utf8Path) -> Result<(), StoreError> {
    if let Err(e) = tokio::fs::rename(tmp, dest).await {
        let _ = tokio::fs::remove_file(tmp).await;
        return Err(StoreError::io(dest, e));
    }
    Ok(())
}
