pub mod report;
pub mod sync;
pub mod tracker;

// Re-export core engine components
pub use report::{SyncReport, TransferFailure};
pub use sync::{
    DownloadRequest, ExecutionOutcome, SyncEngine, SyncError, SyncOptions, TransferEvent,
    TransferScheduler, UploadRequest,
};
pub use tracker::{ProgressTracker, TransferSnapshot};

// Decision knobs live in the domain crate but are part of the request surface
pub use bucketsync_core::diff::{ChangeDetection, DownloadPolicy};
