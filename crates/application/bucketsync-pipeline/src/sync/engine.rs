use std::sync::Arc;

use bucketsync_core::diff::{
    download_action, download_rel_path, plain_md5, retain_unique_paths, unsafe_key_action,
    upload_action, ChangeDetection, DownloadPolicy,
};
use bucketsync_core::path_utils::BucketPath;
use bucketsync_core::{SyncAction, SyncDirection, SyncPlan};
use bucketsync_infra::{compute_file_md5, ObjectStore};
use camino::{Utf8Path, Utf8PathBuf};
use chrono::Utc;
use futures::stream::{self, StreamExt, TryStreamExt};
use tokio::sync::mpsc::Sender;
use tracing::{info, warn};

use crate::report::SyncReport;
use crate::sync::execute::{TransferEvent, TransferScheduler};
use crate::sync::local::scan_local_tree;
use crate::sync::remote::list_remote;
use crate::sync::{DownloadRequest, SyncError, SyncOptions, UploadRequest};

/// Plans and runs one sync direction against a shared store.
pub struct SyncEngine {
    store: Arc<dyn ObjectStore>,
}

impl SyncEngine {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// Walk the local tree and decide an action for every file.
    ///
    /// Head probes run concurrently (bounded by `max_workers`); any probe
    /// failure other than "not found" aborts planning.
    pub async fn plan_upload(&self, req: &UploadRequest) -> Result<SyncPlan, SyncError> {
        req.options.validate()?;

        let files = scan_local_tree(&req.local_root).await?;
        if files.is_empty() {
            info!("no local files under {}", req.local_root);
            return Ok(SyncPlan::empty(SyncDirection::Upload));
        }

        let root_name = if req.include_root_name {
            root_name(&req.local_root)
        } else {
            None
        };

        let checksum = req.options.change_detection == ChangeDetection::Checksum;
        let store = &self.store;
        let mut actions: Vec<SyncAction> = stream::iter(files)
            .map(|file| {
                let key = BucketPath::join_key([
                    req.prefix.as_str(),
                    root_name.as_deref().unwrap_or(""),
                    file.rel_path.as_str(),
                ]);
                async move {
                    let remote = store.head(&key).await?;
                    let comparable = remote
                        .as_ref()
                        .and_then(|m| m.etag.as_deref())
                        .and_then(plain_md5)
                        .is_some();
                    let local_md5 = if checksum && comparable {
                        Some(file_md5(&file.abs_path).await?)
                    } else {
                        None
                    };
                    Ok::<_, SyncError>(upload_action(
                        file,
                        key,
                        remote.as_ref(),
                        local_md5.as_deref(),
                    ))
                }
            })
            .buffered(req.options.max_workers)
            .try_collect()
            .await?;

        for dup in retain_unique_paths(&mut actions) {
            warn!("duplicate local path {dup} ignored");
        }

        Ok(SyncPlan {
            direction: SyncDirection::Upload,
            actions,
        })
    }

    /// List everything under the prefix and decide where each object lands.
    pub async fn plan_download(&self, req: &DownloadRequest) -> Result<SyncPlan, SyncError> {
        req.options.validate()?;

        let listing_prefix = BucketPath::listing_prefix(&req.prefix);
        let dest_root = download_root(req);
        let objects = list_remote(self.store.as_ref(), &listing_prefix).await?;

        let mut actions = Vec::with_capacity(objects.len());
        for object in objects {
            let Some(rel_path) = download_rel_path(&object.key, &listing_prefix) else {
                warn!("refusing to download {}: unsafe local path", object.key);
                actions.push(unsafe_key_action(object));
                continue;
            };

            let local_size = match req.options.download_policy {
                DownloadPolicy::SkipExisting => existing_size(&dest_root.join(&rel_path)).await,
                DownloadPolicy::Always => None,
            };
            actions.push(download_action(
                object,
                rel_path,
                &dest_root,
                local_size,
                req.options.download_policy,
            ));
        }

        for dup in retain_unique_paths(&mut actions) {
            warn!("several keys map to local path {dup}; keeping the first");
        }

        Ok(SyncPlan {
            direction: SyncDirection::Download,
            actions,
        })
    }

    /// Run a plan to completion. Never fails: per-transfer errors end up in the report.
    pub async fn execute(
        &self,
        plan: &SyncPlan,
        options: &SyncOptions,
        progress_tx: Option<Sender<TransferEvent>>,
    ) -> SyncReport {
        let started_at = Utc::now();
        let scheduler = TransferScheduler::new(self.store.clone(), options.max_workers);
        let outcome = scheduler.run(plan, progress_tx).await;
        let report = SyncReport::new(plan, &outcome.results, started_at);
        info!("{}", report.summary_line());
        report
    }

    /// Plan + execute.
    pub async fn upload(
        &self,
        req: &UploadRequest,
        progress_tx: Option<Sender<TransferEvent>>,
    ) -> Result<SyncReport, SyncError> {
        let plan = self.plan_upload(req).await?;
        Ok(self.execute(&plan, &req.options, progress_tx).await)
    }

    /// Plan + execute. The destination directory is created even when nothing is listed.
    pub async fn download(
        &self,
        req: &DownloadRequest,
        progress_tx: Option<Sender<TransferEvent>>,
    ) -> Result<SyncReport, SyncError> {
        let plan = self.plan_download(req).await?;
        let dest_root = download_root(req);
        tokio::fs::create_dir_all(&dest_root)
            .await
            .map_err(|e| SyncError::Local(format!("create {dest_root} failed: {e}")))?;
        Ok(self.execute(&plan, &req.options, progress_tx).await)
    }
}

/// `local_root/<last prefix segment>`, or `local_root` itself for an empty prefix.
pub fn download_root(req: &DownloadRequest) -> Utf8PathBuf {
    match BucketPath::base_name(&req.prefix) {
        Some(name) => req.local_root.join(name),
        None => req.local_root.clone(),
    }
}

fn root_name(root: &Utf8Path) -> Option<String> {
    let resolved = root
        .canonicalize_utf8()
        .unwrap_or_else(|_| root.to_owned());
    BucketPath::base_name(resolved.as_str())
}

async fn existing_size(path: &Utf8Path) -> Option<u64> {
    tokio::fs::metadata(path)
        .await
        .ok()
        .filter(|m| m.is_file())
        .map(|m| m.len())
}

async fn file_md5(path: &Utf8Path) -> Result<String, SyncError> {
    let path = path.to_owned();
    tokio::task::spawn_blocking(move || {
        compute_file_md5(&path).map_err(|e| SyncError::Local(format!("hash {path}: {e}")))
    })
    .await
    .map_err(|e| SyncError::Local(format!("hash task failed: {e}")))?
}
