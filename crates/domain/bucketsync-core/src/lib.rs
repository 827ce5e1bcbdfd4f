use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

pub mod diff;
pub mod path_utils;

/// An object as reported by a remote listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteObject {
    pub key: String,
    pub size: u64,
    pub etag: Option<String>,
}

/// Result of probing a single key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMeta {
    pub size: u64,
    pub etag: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFile {
    /// Path relative to the sync root, always `/`-separated.
    pub rel_path: String,
    pub abs_path: Utf8PathBuf,
    pub size: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncDirection {
    Upload,
    Download,
}

impl SyncDirection {
    /// Past-tense verb used in summaries ("3 uploaded").
    pub fn verb(&self) -> &'static str {
        match self {
            SyncDirection::Upload => "uploaded",
            SyncDirection::Download => "downloaded",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Remote size is at least the local size.
    AlreadyUploaded,
    /// Remote etag equals the local MD5.
    ChecksumMatch,
    /// Local size is at least the remote size.
    AlreadyDownloaded,
    /// The key would resolve outside the destination root.
    UnsafePath,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SkipReason::AlreadyUploaded => "already uploaded",
            SkipReason::ChecksumMatch => "checksum match",
            SkipReason::AlreadyDownloaded => "already downloaded",
            SkipReason::UnsafePath => "unsafe path",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncAction {
    Skip {
        path: String,
        size: u64,
        reason: SkipReason,
    },
    Upload {
        file: LocalFile,
        key: String,
    },
    /// Upload over an existing object.
    Overwrite {
        file: LocalFile,
        key: String,
        remote_size: u64,
    },
    Download {
        object: RemoteObject,
        rel_path: String,
        target: Utf8PathBuf,
    },
}

impl SyncAction {
    /// Relative path this action was decided for.
    pub fn path(&self) -> &str {
        match self {
            SyncAction::Skip { path, .. } => path,
            SyncAction::Upload { file, .. } | SyncAction::Overwrite { file, .. } => &file.rel_path,
            SyncAction::Download { rel_path, .. } => rel_path,
        }
    }

    /// Bytes this action accounts for in progress totals.
    pub fn size(&self) -> u64 {
        match self {
            SyncAction::Skip { size, .. } => *size,
            SyncAction::Upload { file, .. } | SyncAction::Overwrite { file, .. } => file.size,
            SyncAction::Download { object, .. } => object.size,
        }
    }

    pub fn is_skip(&self) -> bool {
        matches!(self, SyncAction::Skip { .. })
    }
}

#[derive(Debug, Clone)]
pub struct SyncPlan {
    pub direction: SyncDirection,
    pub actions: Vec<SyncAction>,
}

impl SyncPlan {
    pub fn empty(direction: SyncDirection) -> Self {
        Self {
            direction,
            actions: Vec::new(),
        }
    }

    pub fn total_files(&self) -> u64 {
        self.actions.len() as u64
    }

    pub fn total_bytes(&self) -> u64 {
        self.actions.iter().map(SyncAction::size).sum()
    }

    pub fn transfer_count(&self) -> usize {
        self.actions.iter().filter(|a| !a.is_skip()).count()
    }

    pub fn skip_count(&self) -> usize {
        self.actions.iter().filter(|a| a.is_skip()).count()
    }

    pub fn transfers(&self) -> impl Iterator<Item = &SyncAction> {
        self.actions.iter().filter(|a| !a.is_skip())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferOutcome {
    Success,
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct TransferResult {
    pub action: SyncAction,
    pub outcome: TransferOutcome,
}

impl TransferResult {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, TransferOutcome::Success)
    }
}
