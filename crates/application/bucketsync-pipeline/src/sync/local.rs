use bucketsync_core::path_utils::BucketPath;
use bucketsync_core::LocalFile;
use camino::{Utf8Path, Utf8PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::sync::SyncError;

/// Walk `root` and return every regular file under it, sorted by relative path.
/// Links to files are included under the link's own path; directory links are not followed.
///
/// Entries that cannot be read are logged and left out; a missing root is an error.
pub fn walk_local_tree(root: &Utf8Path) -> Result<Vec<LocalFile>, SyncError> {
    if !root.is_dir() {
        return Err(SyncError::Local(format!("{root} is not a directory")));
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(root) {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!("skipping unreadable entry under {root}: {e}");
                continue;
            }
        };
        let file_type = entry.file_type();
        if file_type.is_symlink() {
            match std::fs::metadata(entry.path()) {
                Ok(target) if target.is_file() => {}
                Ok(_) => {
                    debug!("not following directory link {}", entry.path().display());
                    continue;
                }
                Err(e) => {
                    warn!("skipping dangling link {}: {e}", entry.path().display());
                    continue;
                }
            }
        } else if !file_type.is_file() {
            continue;
        }

        let abs_path = match Utf8PathBuf::from_path_buf(entry.into_path()) {
            Ok(p) => p,
            Err(p) => {
                warn!("skipping non UTF-8 path {}", p.display());
                continue;
            }
        };
        let size = match entry_size(&abs_path) {
            Ok(s) => s,
            Err(e) => {
                warn!("skipping {abs_path}: {e}");
                continue;
            }
        };
        let rel = abs_path
            .strip_prefix(root)
            .map_err(|e| SyncError::Local(format!("{abs_path} outside {root}: {e}")))?;

        files.push(LocalFile {
            rel_path: BucketPath::normalize(rel.as_str()),
            abs_path,
            size,
        });
    }

    files.sort_by(|a, b| a.rel_path.cmp(&b.rel_path));
    debug!("found {} local files under {root}", files.len());
    Ok(files)
}

fn entry_size(path: &Utf8Path) -> std::io::Result<u64> {
    Ok(std::fs::metadata(path)?.len())
}

/// Async wrapper; the walk itself is blocking filesystem work.
pub async fn scan_local_tree(root: &Utf8Path) -> Result<Vec<LocalFile>, SyncError> {
    let root = root.to_owned();
    tokio::task::spawn_blocking(move || walk_local_tree(&root))
        .await
        .map_err(|e| SyncError::Local(format!("local scan task failed: {e}")))?
}
