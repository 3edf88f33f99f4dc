//! Persistent record of what a migration already handled

use ferry_core::{FerryError, FerryResult, LogicalPath};
use std::collections::BTreeSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::options::RetryPolicy;

pub const TRANSFERRED_FILE: &str = "transferred_files.json";
pub const FAILED_FILE: &str = "failed_files.json";

/// Succeeded and failed paths, kept disjoint
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferIndex {
    succeeded: BTreeSet<LogicalPath>,
    failed: BTreeSet<LogicalPath>,
}

impl TransferIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read both sets from `dir`. Missing files count as empty sets.
    pub async fn load(dir: &Path) -> FerryResult<Self> {
        let succeeded = read_set(&dir.join(TRANSFERRED_FILE)).await?;
        let mut failed = read_set(&dir.join(FAILED_FILE)).await?;
        failed.retain(|p| !succeeded.contains(p));
        debug!(
            dir = %dir.display(),
            succeeded = succeeded.len(),
            failed = failed.len(),
            "index loaded"
        );
        Ok(Self { succeeded, failed })
    }

    /// Write both sets under `dir`, each through a temporary sibling.
    pub async fn persist(&self, dir: &Path) -> FerryResult<()> {
        fs::create_dir_all(dir).await?;
        write_set(&dir.join(TRANSFERRED_FILE), &self.succeeded).await?;
        write_set(&dir.join(FAILED_FILE), &self.failed).await
    }

    pub fn record_success(&mut self, path: LogicalPath) {
        self.failed.remove(&path);
        self.succeeded.insert(path);
    }

    pub fn record_failure(&mut self, path: LogicalPath) {
        if !self.succeeded.contains(&path) {
            self.failed.insert(path);
        }
    }

    /// Whether `path` needs no further attempt under `policy`.
    pub fn is_settled(&self, path: &LogicalPath, policy: RetryPolicy) -> bool {
        self.succeeded.contains(path)
            || (policy == RetryPolicy::SkipFailed && self.failed.contains(path))
    }

    pub fn succeeded(&self) -> &BTreeSet<LogicalPath> {
        &self.succeeded
    }

    pub fn failed(&self) -> &BTreeSet<LogicalPath> {
        &self.failed
    }

    pub fn len(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

async fn read_set(path: &Path) -> FerryResult<BTreeSet<LogicalPath>> {
    match fs::read(path).await {
        Ok(raw) => serde_json::from_slice(&raw).map_err(|e| {
            FerryError::Serialization(format!("{}: {e}", path.display()))
        }),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(BTreeSet::new()),
        Err(e) => Err(e.into()),
    }
}

async fn write_set(path: &Path, set: &BTreeSet<LogicalPath>) -> FerryResult<()> {
    let data = serde_json::to_vec(set).map_err(|e| FerryError::Serialization(e.to_string()))?;

    let temp_path: PathBuf = path.with_extension("json.tmp");
    let mut file = fs::File::create(&temp_path).await?;
    file.write_all(&data).await?;
    file.sync_all().await?;

    fs::rename(&temp_path, path).await?;
    Ok(())
}
