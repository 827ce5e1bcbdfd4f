use bucketsync_config::{DEFAULT_MAX_WORKERS, MIN_WORKERS};
use bucketsync_core::diff::{ChangeDetection, DownloadPolicy};
use bucketsync_infra::StoreError;
use camino::Utf8PathBuf;

pub mod engine;
pub mod execute;
pub mod local;
pub mod remote;

pub use engine::SyncEngine;
pub use execute::{CounterSnapshot, ExecutionOutcome, TransferCounters, TransferEvent, TransferScheduler};

#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Upper bound on concurrent store calls, for head probes and transfers alike.
    pub max_workers: usize,
    pub change_detection: ChangeDetection,
    pub download_policy: DownloadPolicy,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            max_workers: DEFAULT_MAX_WORKERS,
            change_detection: ChangeDetection::default(),
            download_policy: DownloadPolicy::default(),
        }
    }
}

impl SyncOptions {
    pub fn validate(&self) -> Result<(), SyncError> {
        if self.max_workers < MIN_WORKERS {
            return Err(SyncError::InvalidRequest(format!(
                "max_workers must be at least {MIN_WORKERS}"
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub local_root: Utf8PathBuf,
    /// Key namespace; may be empty.
    pub prefix: String,
    /// Put the local directory's own name between the prefix and the relative path.
    pub include_root_name: bool,
    pub options: SyncOptions,
}

#[derive(Debug, Clone)]
pub struct DownloadRequest {
    /// Remote "directory" to fetch; treated as `prefix/` when non-empty.
    pub prefix: String,
    /// Files land under `local_root/<last prefix segment>/`.
    pub local_root: Utf8PathBuf,
    pub options: SyncOptions,
}

/// High-level error type for sync operations.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("Object store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("Local state error: {0}")]
    Local(String),
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl From<StoreError> for SyncError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Unavailable(msg) => SyncError::StoreUnavailable(msg),
            io @ StoreError::Io { .. } => SyncError::Local(io.to_string()),
        }
    }
}
