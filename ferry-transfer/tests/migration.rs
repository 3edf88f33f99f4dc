use bytes::Bytes;
use ferry_core::{FerryError, LogicalPath, Provider, Settings};
use ferry_providers::ProviderClients;
use ferry_storage::Storage;
use ferry_transfer::{
    disk_to_blob, s3_to_blob, DiskToBlob, FileTransfer, FnTransfer, Migration, PersistPolicy,
    Side, StorageSource, TransferIndex, TransferOptions,
};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

struct Fixture {
    mount: tempfile::TempDir,
    index: tempfile::TempDir,
    storage: Arc<Storage>,
}

fn fixture() -> Fixture {
    let mount = tempfile::tempdir().unwrap();
    let index = tempfile::tempdir().unwrap();
    let mut settings = Settings::default();
    settings.disk.mount = mount.path().to_path_buf();
    settings.s3.bucket = "source-bucket".into();
    settings.azure.container = "target-container".into();
    let storage = Arc::new(Storage::new(&settings, ProviderClients::in_memory()));
    Fixture { mount, index, storage }
}

fn write_local(mount: &Path, relative: &str, data: &[u8]) {
    let path = mount.join(relative);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, data).unwrap();
}

fn p(raw: &str) -> LogicalPath {
    LogicalPath::new(raw)
}

#[tokio::test]
async fn test_disk_to_blob_moves_every_file() {
    let fx = fixture();
    write_local(fx.mount.path(), "data/a.csv", b"id\n1\n");
    write_local(fx.mount.path(), "data/nested/b.json", b"{}");

    let report = disk_to_blob(fx.storage.clone(), fx.index.path(), None)
        .run(&[p("/app/data")])
        .await
        .unwrap();

    assert_eq!(report.succeeded(), 2);
    assert_eq!(report.failed(), 0);
    assert_eq!(report.bytes(), 7);

    let blob = fx.storage.provider(Provider::Azure);
    assert_eq!(
        blob.download(&p("/app/data/a.csv")).await.unwrap(),
        Bytes::from_static(b"id\n1\n")
    );
    assert!(blob.exists(&p("/app/data/nested/b.json")).await.unwrap());
    assert!(fx.mount.path().join("data/a.csv").exists());
}

#[tokio::test]
async fn test_rerun_is_idempotent() {
    let fx = fixture();
    write_local(fx.mount.path(), "data/a.csv", b"a");
    write_local(fx.mount.path(), "data/b.csv", b"b");
    let folders = [p("/app/data")];

    disk_to_blob(fx.storage.clone(), fx.index.path(), None)
        .run(&folders)
        .await
        .unwrap();
    let first = TransferIndex::load(fx.index.path()).await.unwrap();

    let report = disk_to_blob(fx.storage.clone(), fx.index.path(), None)
        .run(&folders)
        .await
        .unwrap();
    let second = TransferIndex::load(fx.index.path()).await.unwrap();

    assert_eq!(report.attempted(), 0);
    assert_eq!(report.skipped(), 2);
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_failing_file_does_not_stop_the_folder() {
    let fx = fixture();
    for name in ["1.txt", "2.txt", "3.txt", "4.txt"] {
        write_local(fx.mount.path(), &format!("data/{name}"), name.as_bytes());
    }

    let inner = Arc::new(DiskToBlob::new(fx.storage.clone(), Side::cloud(Provider::Azure)));
    let flaky = FnTransfer(move |path: LogicalPath| {
        let inner = inner.clone();
        async move {
            if path.name() == Some("2.txt") {
                return Err(FerryError::backend("azure", "ServerBusy"));
            }
            inner.transfer(&path).await
        }
    });
    let migration = Migration::new(
        StorageSource::new(fx.storage.clone(), Side::Disk),
        flaky,
        fx.index.path(),
    );

    let report = migration.run(&[p("/app/data")]).await.unwrap();
    assert_eq!((report.succeeded(), report.failed()), (3, 1));

    let index = TransferIndex::load(fx.index.path()).await.unwrap();
    assert_eq!(
        index.failed().iter().collect::<Vec<_>>(),
        vec![&p("/app/data/2.txt")]
    );
    assert!(index.succeeded().contains(&p("/app/data/3.txt")));
    assert!(index.succeeded().contains(&p("/app/data/4.txt")));

    let blob = fx.storage.provider(Provider::Azure);
    assert!(!blob.exists(&p("/app/data/2.txt")).await.unwrap());
    assert!(blob.exists(&p("/app/data/4.txt")).await.unwrap());
}

#[tokio::test]
async fn test_missing_local_file_is_not_found() {
    let fx = fixture();
    let migration = Migration::new(
        StorageSource::new(fx.storage.clone(), Side::Disk),
        DiskToBlob::new(fx.storage.clone(), Side::cloud(Provider::Azure)),
        fx.index.path(),
    );
    let ghost = p("/app/ghost.txt");
    assert_eq!(migration.run_folder(&ghost).await.unwrap().attempted, 0);

    let err = DiskToBlob::new(fx.storage.clone(), Side::cloud(Provider::Azure))
        .transfer(&ghost)
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_s3_to_blob_copies_content() {
    let fx = fixture();
    let s3 = fx.storage.provider(Provider::Aws).backend().unwrap();
    s3.put(&"exports/day1/a.npy".into(), Bytes::from_static(b"npy-bytes"))
        .await
        .unwrap();
    s3.put(&"exports/day2/b.tif".into(), Bytes::from_static(b"tif-bytes"))
        .await
        .unwrap();

    let report = s3_to_blob(fx.storage.clone(), fx.index.path(), None, None)
        .run(&[p("/app/exports")])
        .await
        .unwrap();
    assert_eq!(report.succeeded(), 2);

    let blob = fx.storage.provider(Provider::Azure);
    assert_eq!(
        blob.download(&p("/app/exports/day2/b.tif")).await.unwrap(),
        Bytes::from_static(b"tif-bytes")
    );
}

#[tokio::test]
async fn test_s3_extensionless_objects_look_like_directories() {
    let fx = fixture();
    let s3 = fx.storage.provider(Provider::Aws).backend().unwrap();
    s3.put(&"exports/README".into(), Bytes::from_static(b"x"))
        .await
        .unwrap();

    let report = s3_to_blob(fx.storage.clone(), fx.index.path(), None, None)
        .run(&[p("/app/exports")])
        .await
        .unwrap();
    assert_eq!((report.attempted(), report.skipped()), (0, 1));
}

#[tokio::test]
async fn test_folders_share_one_index() {
    let fx = fixture();
    write_local(fx.mount.path(), "one/a.txt", b"a");
    write_local(fx.mount.path(), "two/b.txt", b"b");

    let report = disk_to_blob(fx.storage.clone(), fx.index.path(), None)
        .run(&[p("/app/one"), p("/app/two")])
        .await
        .unwrap();
    assert_eq!(report.folders.len(), 2);

    let index = TransferIndex::load(fx.index.path()).await.unwrap();
    assert_eq!(index.succeeded().len(), 2);
    assert!(fx.index.path().join(ferry_transfer::TRANSFERRED_FILE).exists());
    assert!(fx.index.path().join(ferry_transfer::FAILED_FILE).exists());
}

#[tokio::test]
async fn test_resume_after_crash_transfers_the_rest_once() {
    let fx = fixture();
    let names = ["1.txt", "2.txt", "3.txt", "4.txt", "5.txt"];
    for name in names {
        write_local(fx.mount.path(), &format!("data/{name}"), name.as_bytes());
    }
    let folders = [p("/app/data")];
    let options = TransferOptions::default()
        .with_concurrency(1)
        .with_persist(PersistPolicy::EveryFile);

    let completed = Arc::new(Mutex::new(Vec::new()));
    let started = Arc::new(Notify::new());
    // The call numbered `hang_at` never returns, like a process killed mid-file.
    let transfer = |hang_at: Option<usize>| {
        let completed = completed.clone();
        let started = started.clone();
        let calls = Arc::new(AtomicUsize::new(0));
        FnTransfer(move |path: LogicalPath| {
            let completed = completed.clone();
            let started = started.clone();
            let call = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if Some(call) == hang_at {
                    started.notify_one();
                    std::future::pending::<()>().await;
                }
                completed.lock().unwrap().push(path);
                Ok::<u64, FerryError>(1)
            }
        })
    };

    let first = Migration::new(
        StorageSource::new(fx.storage.clone(), Side::Disk),
        transfer(Some(2)),
        fx.index.path(),
    )
    .with_options(options.clone());
    tokio::select! {
        _ = first.run(&folders) => panic!("run should hang on the third file"),
        _ = started.notified() => {}
    }
    drop(first);

    let persisted = TransferIndex::load(fx.index.path()).await.unwrap();
    assert_eq!(persisted.succeeded().len(), 2);
    assert!(persisted.failed().is_empty());

    let report = Migration::new(
        StorageSource::new(fx.storage.clone(), Side::Disk),
        transfer(None),
        fx.index.path(),
    )
    .with_options(options)
    .run(&folders)
    .await
    .unwrap();
    assert_eq!((report.succeeded(), report.skipped()), (3, 2));

    let mut done = completed.lock().unwrap().clone();
    done.sort();
    let expected: Vec<LogicalPath> = names.iter().map(|n| p(&format!("/app/data/{n}"))).collect();
    assert_eq!(done, expected);
    assert_eq!(
        TransferIndex::load(fx.index.path()).await.unwrap().succeeded().len(),
        5
    );
}

#[tokio::test]
async fn test_s3_to_blob_with_explicit_locations() {
    let fx = fixture();
    let archive = fx.storage.provider(Provider::Aws).location("archive");
    archive
        .backend()
        .unwrap()
        .put(&"exports/a.csv".into(), Bytes::from_static(b"id\n"))
        .await
        .unwrap();

    let report = s3_to_blob(
        fx.storage.clone(),
        fx.index.path(),
        Some("archive".into()),
        Some("cold".into()),
    )
    .run(&[p("/app/exports")])
    .await
    .unwrap();
    assert_eq!(report.succeeded(), 1);

    let cold = fx.storage.provider(Provider::Azure).location("cold");
    assert!(cold.exists(&p("/app/exports/a.csv")).await.unwrap());
    let default = fx.storage.provider(Provider::Azure);
    assert!(!default.exists(&p("/app/exports/a.csv")).await.unwrap());
}
