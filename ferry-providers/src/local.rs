//! Local filesystem backend

use async_trait::async_trait;
use bytes::Bytes;
use ferry_core::{FerryError, FerryResult, StorageBackend, StorageKey};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::instrument;
use walkdir::WalkDir;

/// Local disk mounted at the application root
pub struct DiskBackend {
    id: String,
    mount: PathBuf,
}

impl DiskBackend {
    pub fn new(id: impl Into<String>, mount: impl AsRef<Path>) -> Self {
        Self {
            id: id.into(),
            mount: mount.as_ref().to_path_buf(),
        }
    }

    pub fn mount(&self) -> &Path {
        &self.mount
    }

    /// Real path of `key` on this disk.
    pub fn local_path(&self, key: &StorageKey) -> PathBuf {
        let mut real = self.mount.clone();
        for seg in key.segments() {
            real.push(seg);
        }
        real
    }

    fn to_key(&self, real: &Path) -> FerryResult<StorageKey> {
        let relative = real
            .strip_prefix(&self.mount)
            .map_err(|_| FerryError::InvalidPath(real.display().to_string()))?;
        let segments: Vec<_> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect();
        Ok(StorageKey::new(segments.join("/")))
    }

    fn not_found(key: &StorageKey) -> impl Fn(std::io::Error) -> FerryError + '_ {
        move |e| {
            if e.kind() == ErrorKind::NotFound {
                FerryError::NotFound(key.to_string())
            } else {
                FerryError::Io(e)
            }
        }
    }

    async fn ensure_parent(path: &Path) -> FerryResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl StorageBackend for DiskBackend {
    fn id(&self) -> &str {
        &self.id
    }

    fn display_name(&self) -> &str {
        "Local Filesystem"
    }

    async fn exists(&self, key: &StorageKey) -> FerryResult<bool> {
        Ok(fs::try_exists(self.local_path(key)).await?)
    }

    /// Files and directories below `prefix`, sorted. A file prefix lists
    /// itself.
    #[instrument(skip(self), fields(prefix = %prefix))]
    async fn list_prefix(&self, prefix: &StorageKey) -> FerryResult<Vec<StorageKey>> {
        let root = self.local_path(prefix);
        let meta = match fs::metadata(&root).await {
            Ok(meta) => meta,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        if meta.is_file() {
            return Ok(vec![prefix.clone()]);
        }

        let mount = self.mount.clone();
        let walked = tokio::task::spawn_blocking(move || {
            WalkDir::new(&root)
                .min_depth(1)
                .into_iter()
                .map(|entry| entry.map(|e| e.into_path()))
                .collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(|e| FerryError::Other(format!("listing {} aborted: {e}", mount.display())))?
        .map_err(|e| FerryError::Io(e.into()))?;

        let mut keys = walked
            .iter()
            .map(|path| self.to_key(path))
            .collect::<FerryResult<Vec<_>>>()?;
        keys.sort();
        Ok(keys)
    }

    #[instrument(skip(self, data), fields(key = %key, size = data.len()))]
    async fn put(&self, key: &StorageKey, data: Bytes) -> FerryResult<()> {
        let real = self.local_path(key);
        Self::ensure_parent(&real).await?;
        fs::write(&real, &data).await?;
        Ok(())
    }

    async fn download(&self, key: &StorageKey) -> FerryResult<Bytes> {
        let data = fs::read(self.local_path(key))
            .await
            .map_err(Self::not_found(key))?;
        Ok(Bytes::from(data))
    }

    #[instrument(skip(self), fields(key = %key))]
    async fn delete(&self, key: &StorageKey) -> FerryResult<()> {
        let real = self.local_path(key);
        let meta = fs::metadata(&real).await.map_err(Self::not_found(key))?;
        if meta.is_dir() {
            fs::remove_dir_all(&real).await?;
        } else {
            fs::remove_file(&real).await?;
        }
        Ok(())
    }

    #[instrument(skip(self), fields(from = %from, to = %to))]
    async fn server_side_copy(&self, from: &StorageKey, to: &StorageKey) -> FerryResult<()> {
        let dst = self.local_path(to);
        Self::ensure_parent(&dst).await?;
        fs::copy(self.local_path(from), &dst)
            .await
            .map_err(Self::not_found(from))?;
        Ok(())
    }

    #[instrument(skip(self), fields(local = %local.display(), key = %key))]
    async fn upload(&self, local: &Path, key: &StorageKey) -> FerryResult<u64> {
        let dst = self.local_path(key);
        Self::ensure_parent(&dst).await?;
        fs::copy(local, &dst)
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => FerryError::NotFound(local.display().to_string()),
                _ => FerryError::Io(e),
            })
    }

    async fn download_to(&self, key: &StorageKey, local: &Path) -> FerryResult<u64> {
        Self::ensure_parent(local).await?;
        fs::copy(self.local_path(key), local)
            .await
            .map_err(Self::not_found(key))
    }

    /// Real filesystem check rather than the extension heuristic.
    async fn is_directory(&self, key: &StorageKey) -> bool {
        fs::metadata(self.local_path(key))
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false)
    }
}
