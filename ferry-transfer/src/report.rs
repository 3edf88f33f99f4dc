//! Per-folder and per-batch outcome counters

use chrono::{DateTime, Utc};
use ferry_core::LogicalPath;
use serde::Serialize;
use std::time::Duration;
use tracing::info;

#[derive(Debug, Clone, Serialize)]
pub struct FolderReport {
    pub folder: LogicalPath,
    pub started_at: DateTime<Utc>,
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Already settled in the index, or classified as directories
    pub skipped: usize,
    pub bytes: u64,
    pub elapsed: Duration,
}

impl FolderReport {
    pub fn new(folder: LogicalPath) -> Self {
        Self {
            folder,
            started_at: Utc::now(),
            attempted: 0,
            succeeded: 0,
            failed: 0,
            skipped: 0,
            bytes: 0,
            elapsed: Duration::ZERO,
        }
    }

    pub(crate) fn log(&self) {
        info!(
            folder = %self.folder,
            attempted = self.attempted,
            succeeded = self.succeeded,
            failed = self.failed,
            skipped = self.skipped,
            bytes = self.bytes,
            elapsed_ms = self.elapsed.as_millis() as u64,
            "folder done"
        );
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub folders: Vec<FolderReport>,
}

impl BatchReport {
    pub fn attempted(&self) -> usize {
        self.folders.iter().map(|f| f.attempted).sum()
    }

    pub fn succeeded(&self) -> usize {
        self.folders.iter().map(|f| f.succeeded).sum()
    }

    pub fn failed(&self) -> usize {
        self.folders.iter().map(|f| f.failed).sum()
    }

    pub fn skipped(&self) -> usize {
        self.folders.iter().map(|f| f.skipped).sum()
    }

    pub fn bytes(&self) -> u64 {
        self.folders.iter().map(|f| f.bytes).sum()
    }

    pub fn elapsed(&self) -> Duration {
        self.folders.iter().map(|f| f.elapsed).sum()
    }

    pub(crate) fn log(&self) {
        info!(
            folders = self.folders.len(),
            attempted = self.attempted(),
            succeeded = self.succeeded(),
            failed = self.failed(),
            skipped = self.skipped(),
            bytes = self.bytes(),
            "batch done"
        );
    }
}
