use bucketsync_core::{SkipReason, SyncAction};
use bucketsync_infra::store::memory::StoreOp;
use bucketsync_infra::MemoryObjectStore;
use bucketsync_pipeline::{DownloadPolicy, DownloadRequest, SyncEngine, SyncError, SyncOptions};
use camino::Utf8PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

fn dest() -> (TempDir, Utf8PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(dir.path().join("dest")).unwrap();
    (dir, root)
}

fn request(prefix: &str, root: &Utf8PathBuf) -> DownloadRequest {
    DownloadRequest {
        prefix: prefix.to_string(),
        local_root: root.clone(),
        options: SyncOptions::default(),
    }
}

#[tokio::test]
async fn downloads_every_object_under_prefix() {
    let (_dir, root) = dest();
    let store = Arc::new(MemoryObjectStore::new());
    store.insert("x/1.bin", vec![1u8; 10]);
    store.insert("x/2.bin", vec![2u8; 20]);
    let engine = SyncEngine::new(store.clone());

    let req = request("x", &root);
    let plan = engine.plan_download(&req).await.unwrap();
    assert_eq!(plan.actions.len(), 2);
    assert!(plan
        .actions
        .iter()
        .all(|a| matches!(a, SyncAction::Download { .. })));

    let report = engine.download(&req, None).await.unwrap();
    assert_eq!(report.summary_line(), "2 downloaded, 0 skipped, 0 failed");
    assert_eq!(std::fs::metadata(root.join("x/1.bin")).unwrap().len(), 10);
    assert_eq!(std::fs::metadata(root.join("x/2.bin")).unwrap().len(), 20);
}

#[tokio::test]
async fn placeholders_and_sibling_prefixes_are_ignored() {
    let (_dir, root) = dest();
    let store = Arc::new(MemoryObjectStore::new());
    store.insert("x/", Vec::new());
    store.insert("x/sub/", Vec::new());
    store.insert("x/sub/deep.bin", vec![0u8; 3]);
    store.insert("xyz/other.bin", vec![0u8; 4]);
    let engine = SyncEngine::new(store.clone());

    let plan = engine.plan_download(&request("x/", &root)).await.unwrap();
    assert_eq!(plan.actions.len(), 1);
    match &plan.actions[0] {
        SyncAction::Download {
            rel_path, target, ..
        } => {
            assert_eq!(rel_path, "sub/deep.bin");
            assert_eq!(*target, root.join("x").join("sub/deep.bin"));
        }
        other => panic!("expected download, got {other:?}"),
    }
}

#[tokio::test]
async fn empty_prefix_downloads_whole_bucket_into_root() {
    let (_dir, root) = dest();
    let store = Arc::new(MemoryObjectStore::new());
    store.insert("top.txt", vec![0u8; 2]);
    store.insert("a/b.txt", vec![0u8; 3]);
    let engine = SyncEngine::new(store.clone());

    let report = engine.download(&request("", &root), None).await.unwrap();
    assert_eq!(report.transferred, 2);
    assert!(root.join("top.txt").is_file());
    assert!(root.join("a/b.txt").is_file());
}

#[tokio::test]
async fn empty_listing_is_success_and_creates_destination() {
    let (_dir, root) = dest();
    let engine = SyncEngine::new(Arc::new(MemoryObjectStore::new()));

    let report = engine.download(&request("1981", &root), None).await.unwrap();
    assert!(report.is_success());
    assert_eq!(report.transferred, 0);
    assert!(root.join("1981").is_dir());
}

#[tokio::test]
async fn existing_files_are_overwritten_by_default() {
    let (_dir, root) = dest();
    std::fs::create_dir_all(root.join("x")).unwrap();
    std::fs::write(root.join("x/1.bin"), b"stale stale stale").unwrap();

    let store = Arc::new(MemoryObjectStore::new());
    store.insert("x/1.bin", b"fresh".to_vec());
    let engine = SyncEngine::new(store.clone());

    engine.download(&request("x", &root), None).await.unwrap();
    assert_eq!(std::fs::read(root.join("x/1.bin")).unwrap(), b"fresh");
}

#[tokio::test]
async fn skip_existing_policy_skips_complete_files() {
    let (_dir, root) = dest();
    std::fs::create_dir_all(root.join("x")).unwrap();
    std::fs::write(root.join("x/1.bin"), vec![0u8; 10]).unwrap();
    std::fs::write(root.join("x/2.bin"), vec![0u8; 5]).unwrap();

    let store = Arc::new(MemoryObjectStore::new());
    store.insert("x/1.bin", vec![1u8; 10]);
    store.insert("x/2.bin", vec![2u8; 20]);
    let engine = SyncEngine::new(store.clone());

    let mut req = request("x", &root);
    req.options.download_policy = DownloadPolicy::SkipExisting;
    let report = engine.download(&req, None).await.unwrap();

    assert_eq!(report.summary_line(), "1 downloaded, 1 skipped, 0 failed");
    assert_eq!(store.get_count(), 1);
    assert_eq!(std::fs::read(root.join("x/2.bin")).unwrap(), vec![2u8; 20]);
}

#[tokio::test]
async fn traversal_keys_are_never_written() {
    let (dir, root) = dest();
    let store = Arc::new(MemoryObjectStore::new());
    store.insert("x/../escape.txt", b"nope".to_vec());
    store.insert("x/ok.txt", b"fine".to_vec());
    let engine = SyncEngine::new(store.clone());

    let plan = engine.plan_download(&request("x", &root)).await.unwrap();
    assert_eq!(plan.transfer_count(), 1);
    assert!(plan.actions.iter().any(|a| matches!(
        a,
        SyncAction::Skip {
            reason: SkipReason::UnsafePath,
            ..
        }
    )));

    engine.download(&request("x", &root), None).await.unwrap();
    assert!(!dir.path().join("dest/escape.txt").exists());
    assert!(root.join("x/ok.txt").is_file());
}

#[tokio::test]
async fn dot_segment_keys_collapse_onto_one_local_file() {
    let (_dir, root) = dest();
    let store = Arc::new(MemoryObjectStore::new());
    store.insert("x/./a.bin", vec![2u8; 20]);
    store.insert("x/a.bin", vec![1u8; 10]);
    let engine = SyncEngine::new(store.clone());

    let plan = engine.plan_download(&request("x", &root)).await.unwrap();
    assert_eq!(plan.actions.len(), 1);
    match &plan.actions[0] {
        SyncAction::Download {
            rel_path, target, ..
        } => {
            assert_eq!(rel_path, "a.bin");
            assert_eq!(*target, root.join("x").join("a.bin"));
        }
        other => panic!("expected download, got {other:?}"),
    }

    let report = engine.download(&request("x", &root), None).await.unwrap();
    assert_eq!(report.summary_line(), "1 downloaded, 0 skipped, 0 failed");
    assert_eq!(store.get_count(), 1);
}

#[tokio::test]
async fn listing_failure_aborts_before_transfers() {
    let (_dir, root) = dest();
    let store = Arc::new(MemoryObjectStore::new());
    store.insert("x/1.bin", vec![0u8; 1]);
    store.fail_on(StoreOp::List, "x/");
    let engine = SyncEngine::new(store.clone());

    let err = engine.download(&request("x", &root), None).await.unwrap_err();
    assert!(matches!(err, SyncError::StoreUnavailable(_)));
    assert_eq!(store.get_count(), 0);
}
