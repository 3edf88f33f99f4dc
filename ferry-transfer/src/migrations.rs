//! Concrete migration directions

use async_trait::async_trait;
use ferry_core::{FerryResult, LogicalPath, Provider};
use ferry_storage::{Storage, StorageScope};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

use crate::engine::{FileTransfer, Migration, SourceTree};

/// One side of a migration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Side {
    Disk,
    Cloud {
        provider: Provider,
        /// Configured bucket / container when `None`
        location: Option<String>,
    },
}

impl Side {
    pub fn cloud(provider: Provider) -> Self {
        Side::Cloud { provider, location: None }
    }

    pub fn scope<'a>(&self, storage: &'a Storage) -> StorageScope<'a> {
        match self {
            Side::Disk => storage.disk(),
            Side::Cloud { provider, location: None } => storage.provider(*provider),
            Side::Cloud { provider, location: Some(location) } => {
                storage.provider(*provider).location(location.as_str())
            }
        }
    }
}

/// Enumerates a folder through the facade
pub struct StorageSource {
    storage: Arc<Storage>,
    side: Side,
}

impl StorageSource {
    pub fn new(storage: Arc<Storage>, side: Side) -> Self {
        Self { storage, side }
    }
}

#[async_trait]
impl SourceTree for StorageSource {
    async fn enumerate(&self, root: &LogicalPath) -> FerryResult<Vec<LogicalPath>> {
        self.side.scope(&self.storage).rglob(root, "").await
    }

    async fn is_dir(&self, path: &LogicalPath) -> bool {
        self.side
            .scope(&self.storage)
            .is_dir(path)
            .await
            .unwrap_or(false)
    }
}

/// Uploads a file from the disk mount to the same path on blob storage
pub struct DiskToBlob {
    storage: Arc<Storage>,
    blob: Side,
}

impl DiskToBlob {
    pub fn new(storage: Arc<Storage>, blob: Side) -> Self {
        Self { storage, blob }
    }
}

#[async_trait]
impl FileTransfer for DiskToBlob {
    async fn transfer(&self, path: &LogicalPath) -> FerryResult<u64> {
        let key = self.storage.codec().to_storage_key(path)?;
        let local = self.storage.disk_backend().local_path(&key);
        self.blob.scope(&self.storage).upload(&local, path).await
    }
}

/// Downloads from S3 into a scratch file, then uploads it to blob storage
pub struct S3ToBlob {
    storage: Arc<Storage>,
    s3: Side,
    blob: Side,
}

impl S3ToBlob {
    pub fn new(storage: Arc<Storage>, s3: Side, blob: Side) -> Self {
        Self { storage, s3, blob }
    }
}

#[async_trait]
impl FileTransfer for S3ToBlob {
    async fn transfer(&self, path: &LogicalPath) -> FerryResult<u64> {
        let scratch = tempfile::NamedTempFile::new()?;
        let fetched = self
            .s3
            .scope(&self.storage)
            .download_to(path, scratch.path())
            .await?;
        debug!(path = %path, bytes = fetched, "staged");
        self.blob
            .scope(&self.storage)
            .upload(scratch.path(), path)
            .await
    }
}

/// Disk mount to an Azure container, the configured one when `container`
/// is `None`.
pub fn disk_to_blob(
    storage: Arc<Storage>,
    index_dir: impl Into<PathBuf>,
    container: Option<String>,
) -> Migration<StorageSource, DiskToBlob> {
    let blob = Side::Cloud { provider: Provider::Azure, location: container };
    Migration::new(
        StorageSource::new(storage.clone(), Side::Disk),
        DiskToBlob::new(storage, blob),
        index_dir,
    )
}

/// S3 bucket to Azure container. `None` picks the configured bucket or
/// container.
pub fn s3_to_blob(
    storage: Arc<Storage>,
    index_dir: impl Into<PathBuf>,
    bucket: Option<String>,
    container: Option<String>,
) -> Migration<StorageSource, S3ToBlob> {
    let s3 = Side::Cloud { provider: Provider::Aws, location: bucket };
    let blob = Side::Cloud { provider: Provider::Azure, location: container };
    Migration::new(
        StorageSource::new(storage.clone(), s3.clone()),
        S3ToBlob::new(storage, s3, blob),
        index_dir,
    )
}
