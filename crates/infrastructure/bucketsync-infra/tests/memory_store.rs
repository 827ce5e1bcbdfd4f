use bucketsync_infra::store::memory::StoreOp;
use bucketsync_infra::{MemoryObjectStore, ObjectStore, StoreError};
use camino::Utf8PathBuf;
use futures::TryStreamExt;

#[tokio::test]
async fn list_excludes_placeholders_and_other_prefixes() {
    let store = MemoryObjectStore::new();
    store.insert("x/", Vec::new());
    store.insert("x/1.bin", vec![0u8; 10]);
    store.insert("x/sub/2.bin", vec![0u8; 20]);
    store.insert("y/3.bin", vec![0u8; 30]);

    let listed: Vec<_> = store.list("x/").try_collect().await.unwrap();
    let keys: Vec<_> = listed.iter().map(|o| o.key.as_str()).collect();
    assert_eq!(keys, vec!["x/1.bin", "x/sub/2.bin"]);
    assert_eq!(listed[1].size, 20);
}

#[tokio::test]
async fn head_size_reports_absent_keys() {
    let store = MemoryObjectStore::new();
    store.insert("a.txt", b"hello".to_vec());

    assert_eq!(store.head_size("a.txt").await.unwrap(), Some(5));
    assert_eq!(store.head_size("missing.txt").await.unwrap(), None);
    assert_eq!(store.head_count(), 2);
}

#[tokio::test]
async fn get_creates_parent_directories() {
    let dir = tempfile::tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
    let store = MemoryObjectStore::new();
    store.insert("x/deep/file.bin", vec![7u8; 12]);

    let dest = root.join("out").join("deep").join("file.bin");
    let written = store.get("x/deep/file.bin", &dest).await.unwrap();
    assert_eq!(written, 12);
    assert_eq!(std::fs::read(&dest).unwrap(), vec![7u8; 12]);
    assert!(!root.join("out/deep/file.bin.part").exists());
}

#[tokio::test]
async fn put_overwrites_existing_object() {
    let dir = tempfile::tempdir().unwrap();
    let src = Utf8PathBuf::from_path_buf(dir.path().join("a.txt")).unwrap();
    std::fs::write(&src, b"new contents").unwrap();

    let store = MemoryObjectStore::new();
    store.insert("a.txt", b"old".to_vec());
    store.put("a.txt", &src).await.unwrap();

    assert_eq!(store.object("a.txt").unwrap(), b"new contents".to_vec());
    assert_eq!(store.put_count(), 1);
}

#[tokio::test]
async fn injected_failures_surface_as_unavailable() {
    let dir = tempfile::tempdir().unwrap();
    let src = Utf8PathBuf::from_path_buf(dir.path().join("a.txt")).unwrap();
    std::fs::write(&src, b"x").unwrap();

    let store = MemoryObjectStore::new();
    store.fail_on(StoreOp::Put, "a.txt");
    store.fail_on(StoreOp::Head, "b.txt");
    store.fail_on(StoreOp::List, "p/");

    assert!(matches!(
        store.put("a.txt", &src).await,
        Err(StoreError::Unavailable(_))
    ));
    assert!(matches!(
        store.head("b.txt").await,
        Err(StoreError::Unavailable(_))
    ));
    let listed: Result<Vec<_>, _> = store.list("p/").try_collect().await;
    assert!(matches!(listed, Err(StoreError::Unavailable(_))));
}

#[tokio::test]
async fn failed_rename_leaves_no_partial_file() {
    let dir = tempfile::tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
    let store = MemoryObjectStore::new();
    store.insert("a.bin", vec![1u8; 4]);

    // A non-empty directory where the file should go makes the final rename fail.
    let dest = root.join("a.bin");
    std::fs::create_dir_all(dest.join("occupied")).unwrap();

    let err = store.get("a.bin", &dest).await.unwrap_err();
    assert!(matches!(err, StoreError::Io { .. }));
    assert!(!root.join("a.bin.part").exists());
    assert!(dest.is_dir());
}
