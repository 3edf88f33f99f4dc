//! Resumable migration loop
//!
//! For every source folder: load the index, enumerate the folder, drop what
//! the index already settled and what is a directory, transfer the rest, and
//! write the index back. A failed file is logged and recorded; it never
//! stops the folder.

use async_trait::async_trait;
use ferry_core::{FerryError, FerryResult, LogicalPath};
use futures::stream::{self, StreamExt};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, error, info};

use crate::index::TransferIndex;
use crate::options::{PersistPolicy, TransferOptions};
use crate::report::{BatchReport, FolderReport};

/// Where the files of a migration come from
#[async_trait]
pub trait SourceTree: Send + Sync {
    /// Every descendant of `root`. May include directories.
    async fn enumerate(&self, root: &LogicalPath) -> FerryResult<Vec<LogicalPath>>;

    async fn is_dir(&self, path: &LogicalPath) -> bool;
}

/// Moves one file to the destination, returning the bytes moved
#[async_trait]
pub trait FileTransfer: Send + Sync {
    async fn transfer(&self, path: &LogicalPath) -> FerryResult<u64>;
}

/// [`FileTransfer`] from an async closure
pub struct FnTransfer<F>(pub F);

#[async_trait]
impl<F, Fut> FileTransfer for FnTransfer<F>
where
    F: Fn(LogicalPath) -> Fut + Send + Sync,
    Fut: Future<Output = FerryResult<u64>> + Send,
{
    async fn transfer(&self, path: &LogicalPath) -> FerryResult<u64> {
        (self.0)(path.clone()).await
    }
}

pub struct Migration<S, T> {
    source: S,
    transfer: T,
    index_dir: PathBuf,
    options: TransferOptions,
}

impl<S: SourceTree, T: FileTransfer> Migration<S, T> {
    pub fn new(source: S, transfer: T, index_dir: impl Into<PathBuf>) -> Self {
        Self {
            source,
            transfer,
            index_dir: index_dir.into(),
            options: TransferOptions::default(),
        }
    }

    pub fn with_options(mut self, options: TransferOptions) -> Self {
        self.options = options;
        self
    }

    pub fn index_dir(&self) -> &Path {
        &self.index_dir
    }

    pub fn options(&self) -> &TransferOptions {
        &self.options
    }

    /// Migrate every folder in order. Folders sharing the index directory
    /// accumulate into the same index.
    pub async fn run(&self, folders: &[LogicalPath]) -> FerryResult<BatchReport> {
        let mut batch = BatchReport::default();
        for folder in folders {
            batch.folders.push(self.run_folder(folder).await?);
        }
        batch.log();
        Ok(batch)
    }

    pub async fn run_folder(&self, folder: &LogicalPath) -> FerryResult<FolderReport> {
        let started = Instant::now();
        let mut report = FolderReport::new(folder.clone());
        let mut index = TransferIndex::load(&self.index_dir).await?;
        info!(folder = %folder, known = index.len(), "folder start");

        let mut pending = Vec::new();
        for path in self.source.enumerate(folder).await? {
            if index.is_settled(&path, self.options.retry_policy) {
                debug!(path = %path, "already handled");
                report.skipped += 1;
            } else if self.source.is_dir(&path).await {
                report.skipped += 1;
            } else {
                pending.push(path);
            }
        }

        let mut outcomes = stream::iter(pending)
            .map(|path| async move {
                let outcome = self.attempt(&path).await;
                (path, outcome)
            })
            .buffer_unordered(self.options.concurrency.max(1));

        while let Some((path, outcome)) = outcomes.next().await {
            report.attempted += 1;
            match outcome {
                Ok(bytes) => {
                    report.succeeded += 1;
                    report.bytes += bytes;
                    index.record_success(path);
                }
                Err(e) => {
                    error!(file = %path, error = %e, "transfer failed");
                    report.failed += 1;
                    index.record_failure(path);
                }
            }
            if self.options.persist == PersistPolicy::EveryFile {
                index.persist(&self.index_dir).await?;
            }
        }

        index.persist(&self.index_dir).await?;
        report.elapsed = started.elapsed();
        report.log();
        Ok(report)
    }

    async fn attempt(&self, path: &LogicalPath) -> FerryResult<u64> {
        match self.options.call_timeout {
            Some(limit) => tokio::time::timeout(limit, self.transfer.transfer(path))
                .await
                .map_err(|_| FerryError::Timeout(limit))?,
            None => self.transfer.transfer(path).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::RetryPolicy;
    use std::collections::HashSet;
    use std::sync::Mutex;
    use std::time::Duration;

    struct FixedTree {
        files: Vec<LogicalPath>,
        dirs: HashSet<LogicalPath>,
    }

    impl FixedTree {
        fn new(files: &[&str], dirs: &[&str]) -> Self {
            Self {
                files: files.iter().map(|f| LogicalPath::new(f)).collect(),
                dirs: dirs.iter().map(|d| LogicalPath::new(d)).collect(),
            }
        }
    }

    #[async_trait]
    impl SourceTree for FixedTree {
        async fn enumerate(&self, root: &LogicalPath) -> FerryResult<Vec<LogicalPath>> {
            Ok(self
                .files
                .iter()
                .chain(&self.dirs)
                .filter(|p| p.starts_with(root))
                .cloned()
                .collect())
        }

        async fn is_dir(&self, path: &LogicalPath) -> bool {
            self.dirs.contains(path)
        }
    }

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<LogicalPath>>,
        fail: Option<&'static str>,
    }

    #[async_trait]
    impl FileTransfer for Recorder {
        async fn transfer(&self, path: &LogicalPath) -> FerryResult<u64> {
            self.seen.lock().unwrap().push(path.clone());
            if self.fail.is_some_and(|f| path.name() == Some(f)) {
                return Err(FerryError::backend("memory", "boom"));
            }
            Ok(1)
        }
    }

    #[tokio::test]
    async fn test_directories_are_not_transferred() {
        let index = tempfile::tempdir().unwrap();
        let tree = FixedTree::new(&["/app/d/a.txt", "/app/d/sub/b.txt"], &["/app/d/sub"]);
        let migration = Migration::new(tree, Recorder::default(), index.path());

        let report = migration.run_folder(&LogicalPath::new("/app/d")).await.unwrap();
        assert_eq!(report.attempted, 2);
        assert_eq!(report.skipped, 1);
        assert_eq!(migration.transfer.seen.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_failure_is_recorded_and_isolated() {
        let index = tempfile::tempdir().unwrap();
        let tree = FixedTree::new(&["/app/d/1.txt", "/app/d/2.txt", "/app/d/3.txt"], &[]);
        let recorder = Recorder { fail: Some("2.txt"), ..Default::default() };
        let migration = Migration::new(tree, recorder, index.path());

        let report = migration.run_folder(&LogicalPath::new("/app/d")).await.unwrap();
        assert_eq!((report.succeeded, report.failed), (2, 1));

        let index = TransferIndex::load(index.path()).await.unwrap();
        assert!(index.failed().contains(&LogicalPath::new("/app/d/2.txt")));
        assert!(index.succeeded().contains(&LogicalPath::new("/app/d/3.txt")));
    }

    #[tokio::test]
    async fn test_timeout_counts_as_failure() {
        let index = tempfile::tempdir().unwrap();
        let tree = FixedTree::new(&["/app/slow.txt"], &[]);
        let slow = FnTransfer(|_path: LogicalPath| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<u64, FerryError>(0)
        });
        let migration = Migration::new(tree, slow, index.path()).with_options(
            TransferOptions::default().with_call_timeout(Duration::from_millis(20)),
        );

        let report = migration.run_folder(&LogicalPath::new("/app")).await.unwrap();
        assert_eq!(report.failed, 1);
    }

    #[tokio::test]
    async fn test_retry_failed_moves_path_to_succeeded() {
        let index = tempfile::tempdir().unwrap();
        let folder = LogicalPath::new("/app/d");
        let files = ["/app/d/1.txt", "/app/d/2.txt"];

        let first = Migration::new(
            FixedTree::new(&files, &[]),
            Recorder { fail: Some("2.txt"), ..Default::default() },
            index.path(),
        );
        first.run_folder(&folder).await.unwrap();

        let skip = Migration::new(FixedTree::new(&files, &[]), Recorder::default(), index.path());
        let report = skip.run_folder(&folder).await.unwrap();
        assert_eq!((report.attempted, report.skipped), (0, 2));

        let retry = Migration::new(FixedTree::new(&files, &[]), Recorder::default(), index.path())
            .with_options(TransferOptions::default().with_retry_policy(RetryPolicy::RetryFailed));
        let report = retry.run_folder(&folder).await.unwrap();
        assert_eq!(report.succeeded, 1);

        let index = TransferIndex::load(index.path()).await.unwrap();
        assert_eq!(index.succeeded().len(), 2);
        assert!(index.failed().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_run_transfers_everything_once() {
        let index = tempfile::tempdir().unwrap();
        let names: Vec<String> = (0..20).map(|i| format!("/app/c/{i:02}.txt")).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let migration = Migration::new(FixedTree::new(&refs, &[]), Recorder::default(), index.path())
            .with_options(
                TransferOptions::default()
                    .with_concurrency(4)
                    .with_persist(PersistPolicy::EveryFolder),
            );

        let report = migration.run_folder(&LogicalPath::new("/app/c")).await.unwrap();
        assert_eq!(report.succeeded, 20);
        let seen: HashSet<_> = migration.transfer.seen.lock().unwrap().iter().cloned().collect();
        assert_eq!(seen.len(), 20);
    }
}
