//! Storage backend trait

use async_trait::async_trait;
use bytes::Bytes;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::fs;

use crate::{error::FerryResult, StorageKey};

/// Extensions treated as files by [`looks_like_directory`].
pub const KNOWN_FILE_EXTENSIONS: &[&str] = &[
    ".npy", ".npz", ".shp", ".gpkg", ".tif", ".json", ".geojson", ".nc", ".csv", ".txt",
    ".tex", ".xlsx", ".md", ".sh", ".zip", ".png",
];

/// Directory heuristic for stores without real directories.
///
/// A key is a directory unless its suffix is a known file extension, so an
/// extensionless file is reported as a directory.
pub fn looks_like_directory(key: &StorageKey) -> bool {
    !key.suffix()
        .map(|suffix| KNOWN_FILE_EXTENSIONS.contains(&suffix))
        .unwrap_or(false)
}

/// Minimal contract every physical store fulfils, bound to one location
/// (bucket, container, or disk mount).
#[async_trait]
pub trait StorageBackend: Send + Sync {
    fn id(&self) -> &str;
    fn display_name(&self) -> &str;

    async fn exists(&self, key: &StorageKey) -> FerryResult<bool>;

    /// Every key below `prefix`, in ascending order.
    async fn list_prefix(&self, prefix: &StorageKey) -> FerryResult<Vec<StorageKey>>;

    async fn put(&self, key: &StorageKey, data: Bytes) -> FerryResult<()>;

    async fn download(&self, key: &StorageKey) -> FerryResult<Bytes>;

    async fn delete(&self, key: &StorageKey) -> FerryResult<()>;

    async fn server_side_copy(&self, from: &StorageKey, to: &StorageKey) -> FerryResult<()>;

    /// Upload a local file, returning the number of bytes sent.
    async fn upload(&self, local: &Path, key: &StorageKey) -> FerryResult<u64> {
        let data = Bytes::from(fs::read(local).await?);
        let len = data.len() as u64;
        self.put(key, data).await?;
        Ok(len)
    }

    /// Download into a local file, returning the number of bytes written.
    async fn download_to(&self, key: &StorageKey, local: &Path) -> FerryResult<u64> {
        let data = self.download(key).await?;
        if let Some(parent) = local.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(local, &data).await?;
        Ok(data.len() as u64)
    }

    /// Temporary read URL; `None` when the store cannot sign one.
    async fn presigned_url(&self, _key: &StorageKey, _ttl: Duration) -> Option<String> {
        None
    }

    async fn is_directory(&self, key: &StorageKey) -> bool {
        looks_like_directory(key)
    }
}

/// Connected client for one provider, handing out location-bound backends
pub trait BackendClient: Send + Sync {
    fn open(&self, location: &str) -> FerryResult<Arc<dyn StorageBackend>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_extensions_are_files() {
        assert!(!looks_like_directory(&StorageKey::from("data/example.csv")));
        assert!(!looks_like_directory(&StorageKey::from("maps/zone.zip")));
        assert!(!looks_like_directory(&StorageKey::from("a/b/c.tif")));
    }

    #[test]
    fn test_unknown_or_missing_extension_is_directory() {
        assert!(looks_like_directory(&StorageKey::from("data")));
        assert!(looks_like_directory(&StorageKey::from("data/sub")));
        // Known limitation: extensionless files look like directories.
        assert!(looks_like_directory(&StorageKey::from("bin/Makefile")));
        assert!(looks_like_directory(&StorageKey::from("model.pkl")));
    }
}
