//! Provider and location bound view of the facade

use bytes::Bytes;
use ferry_core::{
    FerryError, FerryResult, LogicalPath, MoveOptions, Origin, Provider, StorageBackend,
    StorageKey,
};
use ferry_formats::Value;
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::Storage;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Target {
    Cloud {
        provider: Provider,
        location: Option<String>,
    },
    Disk,
}

/// Facade operations bound to one provider and location, or to the disk
#[derive(Clone)]
pub struct StorageScope<'a> {
    storage: &'a Storage,
    target: Target,
}

impl<'a> StorageScope<'a> {
    pub(crate) fn cloud(storage: &'a Storage, provider: Provider) -> Self {
        Self {
            storage,
            target: Target::Cloud { provider, location: None },
        }
    }

    pub(crate) fn disk(storage: &'a Storage) -> Self {
        Self { storage, target: Target::Disk }
    }

    /// Use bucket / container `name` instead of the configured one. Has no
    /// effect on the disk scope.
    pub fn location(mut self, name: impl Into<String>) -> Self {
        if let Target::Cloud { location, .. } = &mut self.target {
            *location = Some(name.into());
        }
        self
    }

    pub fn provider(&self) -> Option<Provider> {
        match &self.target {
            Target::Cloud { provider, .. } => Some(*provider),
            Target::Disk => None,
        }
    }

    /// Backend this scope dispatches to.
    pub fn backend(&self) -> FerryResult<Arc<dyn StorageBackend>> {
        match &self.target {
            Target::Cloud { provider, location } => {
                let location = location
                    .as_deref()
                    .unwrap_or_else(|| self.storage.default_location(*provider));
                self.storage.clients.open(*provider, location)
            }
            Target::Disk => Ok(self.storage.disk.clone() as Arc<dyn StorageBackend>),
        }
    }

    fn key(&self, path: &LogicalPath) -> FerryResult<StorageKey> {
        self.storage.codec.to_storage_key(path)
    }

    pub async fn exists(&self, path: &LogicalPath) -> FerryResult<bool> {
        let key = self.key(path)?;
        self.backend()?.exists(&key).await
    }

    /// Paths below `prefix` whose storage key contains `pattern` once every
    /// `*` is removed. This is a substring filter, not glob matching, and the
    /// root is not part of the matched text.
    pub async fn rglob(&self, prefix: &LogicalPath, pattern: &str) -> FerryResult<Vec<LogicalPath>> {
        let key = self.key(prefix)?;
        let needle = pattern.replace('*', "");
        let keys = self.backend()?.list_prefix(&key).await?;
        Ok(keys
            .iter()
            .filter(|k| k.as_str().contains(&needle))
            .map(|k| self.storage.codec.to_logical_path(k))
            .collect())
    }

    /// Direct children of `dir`: files below it and the first directory
    /// level of anything nested deeper, in ascending order.
    pub async fn iterdir(&self, dir: &LogicalPath) -> FerryResult<Vec<LogicalPath>> {
        let key = self.key(dir)?;
        let depth = key.segments().count();
        let keys = self.backend()?.list_prefix(&key).await?;

        let children: BTreeSet<String> = keys
            .iter()
            .filter_map(|k| k.segments().nth(depth).map(str::to_string))
            .collect();
        Ok(children.into_iter().map(|name| dir.join(name)).collect())
    }

    /// Copy `origin` to `dest`, leaving the origin in place.
    pub async fn copy_file(
        &self,
        origin: &LogicalPath,
        dest: &LogicalPath,
        origin_kind: Origin,
    ) -> FerryResult<()> {
        self.move_file(origin, dest, MoveOptions::copying(origin_kind))
            .await
    }

    /// Put `origin` at `dest`. A remote origin is copied server-side within
    /// the location; a local origin is uploaded from the disk mount.
    #[instrument(skip(self, origin, dest), fields(origin = %origin, dest = %dest))]
    pub async fn move_file(
        &self,
        origin: &LogicalPath,
        dest: &LogicalPath,
        options: MoveOptions,
    ) -> FerryResult<()> {
        let backend = self.backend()?;
        let from = self.key(origin)?;
        let to = self.key(dest)?;

        match options.origin {
            Origin::Remote => backend.server_side_copy(&from, &to).await?,
            Origin::Local => {
                let local = self.storage.disk.local_path(&from);
                backend.upload(&local, &to).await?;
            }
        }

        if options.delete_origin {
            match options.origin {
                Origin::Remote => backend.delete(&from).await?,
                Origin::Local => self.storage.disk.delete(&from).await?,
            }
            debug!("origin removed");
        }
        Ok(())
    }

    /// [`move_file`](Self::move_file) for every file below `origin`,
    /// keeping the layout relative to it under `dest`. Returns the number of
    /// files moved.
    #[instrument(skip(self, origin, dest), fields(origin = %origin, dest = %dest))]
    pub async fn move_folder(
        &self,
        origin: &LogicalPath,
        dest: &LogicalPath,
        options: MoveOptions,
    ) -> FerryResult<usize> {
        let from = self.key(origin)?;
        // Disk listings include directories; object stores list objects only.
        let (backend, real_dirs): (Arc<dyn StorageBackend>, bool) = match options.origin {
            Origin::Local => (self.storage.disk.clone() as Arc<dyn StorageBackend>, true),
            Origin::Remote => (self.backend()?, self.target == Target::Disk),
        };

        let mut files = Vec::new();
        for key in backend.list_prefix(&from).await? {
            if real_dirs && backend.is_directory(&key).await {
                continue;
            }
            files.push(key);
        }

        for key in &files {
            let source = self.storage.codec.to_logical_path(key);
            let relative = source.strip_prefix(origin).unwrap_or_default();
            let target = LogicalPath::from_segments(dest.segments().iter().chain(relative));
            self.move_file(&source, &target, options).await?;
        }

        if options.delete_origin && real_dirs && backend.exists(&from).await? {
            backend.delete(&from).await?;
        }
        Ok(files.len())
    }

    pub async fn delete(&self, path: &LogicalPath) -> FerryResult<()> {
        let key = self.key(path)?;
        self.backend()?.delete(&key).await
    }

    pub async fn download(&self, path: &LogicalPath) -> FerryResult<Bytes> {
        let key = self.key(path)?;
        self.backend()?.download(&key).await
    }

    /// Download into `local`, returning the bytes written.
    pub async fn download_to(&self, path: &LogicalPath, local: &Path) -> FerryResult<u64> {
        let key = self.key(path)?;
        self.backend()?.download_to(&key, local).await
    }

    /// Upload `local` to `path`, returning the bytes sent.
    pub async fn upload(&self, local: &Path, path: &LogicalPath) -> FerryResult<u64> {
        let key = self.key(path)?;
        self.backend()?.upload(local, &key).await
    }

    /// Time-limited read URL; `None` when the backend cannot sign one.
    pub async fn temporary_url(&self, path: &LogicalPath, ttl: Duration) -> Option<String> {
        let key = self.key(path).ok()?;
        self.backend().ok()?.presigned_url(&key, ttl).await
    }

    /// Read `path` and decode it by its extension.
    pub async fn load(&self, path: &LogicalPath) -> FerryResult<Value> {
        let backend = self.backend()?;
        let codec = self.storage.codec.clone();
        self.storage
            .formats
            .load(path, move |source| async move {
                let key = codec.to_storage_key(&source)?;
                backend.download(&key).await
            })
            .await
    }

    /// Encode `value` by the extension of `path` and store it. Returns the
    /// path actually written, which differs for archive formats.
    pub async fn save(&self, path: &LogicalPath, value: &Value) -> FerryResult<LogicalPath> {
        let backend = self.backend()?;
        let codec = self.storage.codec.clone();
        self.storage
            .formats
            .save(path, value, move |local, store| async move {
                let key = codec.to_storage_key(&store)?;
                backend.upload(&local, &key).await
            })
            .await
    }

    /// Directory check: real on disk, extension heuristic on object stores.
    pub async fn is_dir(&self, path: &LogicalPath) -> FerryResult<bool> {
        let key = self.key(path)?;
        Ok(self.backend()?.is_directory(&key).await)
    }
}

impl std::fmt::Debug for StorageScope<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageScope").field("target", &self.target).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferry_core::Settings;
    use ferry_formats::Table;
    use ferry_providers::ProviderClients;

    fn storage() -> (tempfile::TempDir, Storage) {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = Settings::default();
        settings.disk.mount = dir.path().to_path_buf();
        settings.s3.bucket = "bucket".into();
        settings.azure.container = "container".into();
        (dir, Storage::new(&settings, ProviderClients::in_memory()))
    }

    fn p(raw: &str) -> LogicalPath {
        LogicalPath::new(raw)
    }

    fn table() -> Value {
        Value::Table(Table::new(
            vec!["id".into(), "name".into()],
            vec![vec!["1".into(), "a".into()], vec!["2".into(), "b".into()]],
        ))
    }

    #[tokio::test]
    async fn test_save_then_load_on_every_backend() {
        let (_dir, storage) = storage();
        for scope in [
            storage.provider(Provider::Aws),
            storage.provider(Provider::Azure),
            storage.disk(),
        ] {
            let path = p("/app/data/example.csv");
            let stored = scope.save(&path, &table()).await.unwrap();
            assert_eq!(stored, path);
            assert!(scope.exists(&path).await.unwrap());
            assert_eq!(scope.load(&path).await.unwrap(), table());
        }
    }

    #[tokio::test]
    async fn test_unsupported_extension_is_symmetric() {
        let (_dir, storage) = storage();
        let path = p("/app/model.pkl");
        for scope in [
            storage.provider(Provider::Aws),
            storage.provider(Provider::Azure),
            storage.disk(),
        ] {
            let load = scope.load(&path).await.unwrap_err();
            let save = scope.save(&path, &Value::Text("x".into())).await.unwrap_err();
            assert_eq!(load.to_string(), save.to_string());
            assert!(matches!(load, FerryError::UnsupportedFormat { .. }));
        }
    }

    #[tokio::test]
    async fn test_load_missing_is_not_found() {
        let (_dir, storage) = storage();
        let err = storage.cloud().load(&p("/app/missing.json")).await.unwrap_err();
        assert!(err.is_not_found());
        let err = storage.disk().download(&p("/app/missing.json")).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_copy_is_move_without_delete() {
        let (_dir, storage) = storage();
        let scope = storage.cloud();
        scope.save(&p("/app/a/x.txt"), &Value::Text("hi".into())).await.unwrap();

        scope
            .copy_file(&p("/app/a/x.txt"), &p("/app/b/x.txt"), Origin::Remote)
            .await
            .unwrap();
        scope
            .move_file(&p("/app/a/x.txt"), &p("/app/c/x.txt"), MoveOptions::copying(Origin::Remote))
            .await
            .unwrap();

        assert!(scope.exists(&p("/app/a/x.txt")).await.unwrap());
        assert_eq!(
            scope.download(&p("/app/b/x.txt")).await.unwrap(),
            scope.download(&p("/app/c/x.txt")).await.unwrap()
        );
    }

    #[tokio::test]
    async fn test_move_remote_deletes_origin() {
        let (_dir, storage) = storage();
        let scope = storage.cloud();
        scope.save(&p("/app/a/x.txt"), &Value::Text("hi".into())).await.unwrap();
        scope
            .move_file(&p("/app/a/x.txt"), &p("/app/b/x.txt"), MoveOptions::moving(Origin::Remote))
            .await
            .unwrap();

        assert!(!scope.exists(&p("/app/a/x.txt")).await.unwrap());
        assert!(scope.exists(&p("/app/b/x.txt")).await.unwrap());
    }

    #[tokio::test]
    async fn test_move_local_uploads_and_removes_local_file() {
        let (dir, storage) = storage();
        std::fs::create_dir_all(dir.path().join("in")).unwrap();
        std::fs::write(dir.path().join("in/x.txt"), b"local").unwrap();

        let scope = storage.provider(Provider::Azure);
        scope
            .move_file(&p("/app/in/x.txt"), &p("/app/out/x.txt"), MoveOptions::moving(Origin::Local))
            .await
            .unwrap();

        assert_eq!(
            scope.download(&p("/app/out/x.txt")).await.unwrap(),
            Bytes::from_static(b"local")
        );
        assert!(!dir.path().join("in/x.txt").exists());
    }

    #[tokio::test]
    async fn test_move_folder_keeps_layout() {
        let (dir, storage) = storage();
        std::fs::create_dir_all(dir.path().join("src/sub")).unwrap();
        std::fs::write(dir.path().join("src/a.csv"), b"a\n1\n").unwrap();
        std::fs::write(dir.path().join("src/sub/b.txt"), b"b").unwrap();

        let scope = storage.cloud();
        let moved = scope
            .move_folder(&p("/app/src"), &p("/app/dst"), MoveOptions::copying(Origin::Local))
            .await
            .unwrap();

        assert_eq!(moved, 2);
        assert!(scope.exists(&p("/app/dst/a.csv")).await.unwrap());
        assert!(scope.exists(&p("/app/dst/sub/b.txt")).await.unwrap());
        assert!(dir.path().join("src/a.csv").exists());
    }

    #[tokio::test]
    async fn test_iterdir_file_and_nested_grandchild() {
        let (_dir, storage) = storage();
        for scope in [storage.cloud(), storage.disk()] {
            scope.save(&p("/app/d/file.txt"), &Value::Text("1".into())).await.unwrap();
            scope
                .save(&p("/app/d/sub/inner.txt"), &Value::Text("2".into()))
                .await
                .unwrap();

            let children = scope.iterdir(&p("/app/d")).await.unwrap();
            assert_eq!(children, vec![p("/app/d/file.txt"), p("/app/d/sub")]);
        }
    }

    #[tokio::test]
    async fn test_rglob_strips_stars() {
        let (_dir, storage) = storage();
        let scope = storage.cloud();
        let backend = scope.backend().unwrap();
        for key in ["r/a.csv", "r/b.json", "r/deep/c.csv", "other/d.csv"] {
            backend.put(&key.into(), Bytes::from_static(b"x")).await.unwrap();
        }

        let found = scope.rglob(&p("/app/r"), "*.csv").await.unwrap();
        assert_eq!(found, vec![p("/app/r/a.csv"), p("/app/r/deep/c.csv")]);
    }

    #[tokio::test]
    async fn test_rglob_ignores_the_root() {
        let (_dir, storage) = storage();
        let scope = storage.cloud();
        let backend = scope.backend().unwrap();
        for key in ["r/a.csv", "r/b.json"] {
            backend.put(&key.into(), Bytes::from_static(b"x")).await.unwrap();
        }

        assert!(scope.rglob(&p("/app/r"), "*app*").await.unwrap().is_empty());
        assert!(scope.rglob(&p("/app/r"), "/app").await.unwrap().is_empty());
        assert_eq!(
            scope.rglob(&p("/app/r"), "r/b").await.unwrap(),
            vec![p("/app/r/b.json")]
        );
    }

    #[tokio::test]
    async fn test_location_override_is_isolated() {
        let (_dir, storage) = storage();
        let path = p("/app/x.txt");
        storage
            .cloud()
            .location("other")
            .save(&path, &Value::Text("x".into()))
            .await
            .unwrap();

        assert!(storage.cloud().location("other").exists(&path).await.unwrap());
        assert!(!storage.cloud().exists(&path).await.unwrap());
    }

    #[tokio::test]
    async fn test_is_dir_heuristic_and_real_check() {
        let (dir, storage) = storage();
        std::fs::create_dir_all(dir.path().join("bin")).unwrap();
        std::fs::write(dir.path().join("bin/Makefile"), b"all:").unwrap();

        assert!(storage.cloud().is_dir(&p("/app/bin/Makefile")).await.unwrap());
        assert!(!storage.disk().is_dir(&p("/app/bin/Makefile")).await.unwrap());
        assert!(storage.disk().is_dir(&p("/app/bin")).await.unwrap());
    }

    #[tokio::test]
    async fn test_temporary_url_without_signer() {
        let (_dir, storage) = storage();
        let url = storage
            .cloud()
            .temporary_url(&p("/app/x.txt"), Duration::from_secs(60))
            .await;
        assert!(url.is_none());
    }

    #[tokio::test]
    async fn test_path_outside_root_is_rejected() {
        let (_dir, storage) = storage();
        let err = storage.cloud().exists(&p("/srv/x.txt")).await.unwrap_err();
        assert!(matches!(err, FerryError::InvalidPath(_)));
    }
}
