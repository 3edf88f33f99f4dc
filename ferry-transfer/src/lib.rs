//! Ferry Transfer
//!
//! Resumable, failure-tolerant migrations between storage backends. Progress
//! lives in a small on-disk index so an interrupted run picks up where it
//! stopped.

pub mod engine;
pub mod index;
pub mod migrations;
pub mod options;
pub mod report;

pub use engine::{FileTransfer, FnTransfer, Migration, SourceTree};
pub use index::{TransferIndex, FAILED_FILE, TRANSFERRED_FILE};
pub use migrations::{disk_to_blob, s3_to_blob, DiskToBlob, S3ToBlob, Side, StorageSource};
pub use options::{PersistPolicy, RetryPolicy, TransferOptions};
pub use report::{BatchReport, FolderReport};
