//! Per-path decision rules for both sync directions.
//!
//! Everything here is pure: callers gather local/remote metadata and hand it
//! in, so the rules can be tested without a store or a filesystem.

use crate::path_utils::BucketPath;
use crate::{LocalFile, ObjectMeta, RemoteObject, SkipReason, SyncAction};
use camino::{Utf8Path, Utf8PathBuf};
use std::collections::HashSet;

/// How an upload decides that a remote object already matches a local file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ChangeDetection {
    /// Remote size >= local size means uploaded. Cannot see same-size edits.
    #[default]
    Size,
    /// Compare the local MD5 against single-part etags; size rule otherwise.
    Checksum,
}

/// Whether a download looks at an existing local file before fetching.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DownloadPolicy {
    #[default]
    Always,
    /// Local size >= remote size means already downloaded.
    SkipExisting,
}

/// Extract the MD5 hex digest from an etag, if it is a single-part etag.
/// Multipart etags (`<hex>-<n>`) are not content digests and yield `None`.
pub fn plain_md5(etag: &str) -> Option<&str> {
    let tag = etag.trim_matches('"');
    (tag.len() == 32 && tag.bytes().all(|b| b.is_ascii_hexdigit())).then_some(tag)
}

/// Decide what to do with one local file given what the store reports for its key.
///
/// `local_md5` is only consulted when the remote etag is a plain MD5.
pub fn upload_action(
    file: LocalFile,
    key: String,
    remote: Option<&ObjectMeta>,
    local_md5: Option<&str>,
) -> SyncAction {
    let Some(meta) = remote else {
        return SyncAction::Upload { file, key };
    };

    let remote_md5 = meta.etag.as_deref().and_then(plain_md5);
    if let (Some(local), Some(remote)) = (local_md5, remote_md5) {
        return if local.eq_ignore_ascii_case(remote) {
            SyncAction::Skip {
                path: file.rel_path,
                size: file.size,
                reason: SkipReason::ChecksumMatch,
            }
        } else {
            SyncAction::Overwrite {
                key,
                remote_size: meta.size,
                file,
            }
        };
    }

    if meta.size < file.size {
        SyncAction::Overwrite {
            key,
            remote_size: meta.size,
            file,
        }
    } else {
        SyncAction::Skip {
            path: file.rel_path,
            size: file.size,
            reason: SkipReason::AlreadyUploaded,
        }
    }
}

/// Relative local path for a listed key, or `None` if the key is outside the
/// prefix or would escape the destination root.
pub fn download_rel_path(key: &str, listing_prefix: &str) -> Option<String> {
    let rest = BucketPath::strip_prefix(key, listing_prefix)?;
    let rel = BucketPath::join_key([rest]);
    if rel.is_empty() || !BucketPath::verify_safe(rest) {
        return None;
    }
    Some(rel)
}

pub fn download_action(
    object: RemoteObject,
    rel_path: String,
    dest_root: &Utf8Path,
    local_size: Option<u64>,
    policy: DownloadPolicy,
) -> SyncAction {
    if policy == DownloadPolicy::SkipExisting {
        if let Some(size) = local_size {
            if size >= object.size {
                return SyncAction::Skip {
                    path: rel_path,
                    size: object.size,
                    reason: SkipReason::AlreadyDownloaded,
                };
            }
        }
    }

    let target: Utf8PathBuf = dest_root.join(&rel_path);
    SyncAction::Download {
        object,
        rel_path,
        target,
    }
}

pub fn unsafe_key_action(object: RemoteObject) -> SyncAction {
    SyncAction::Skip {
        path: object.key,
        size: object.size,
        reason: SkipReason::UnsafePath,
    }
}

/// Keep the first action for each relative path. Returns the dropped paths.
pub fn retain_unique_paths(actions: &mut Vec<SyncAction>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut dropped = Vec::new();
    actions.retain(|a| {
        if seen.insert(a.path().to_string()) {
            true
        } else {
            dropped.push(a.path().to_string());
            false
        }
    });
    dropped
}
