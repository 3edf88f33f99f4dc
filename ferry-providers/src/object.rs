//! Object-store backed buckets and containers
//!
//! S3, Azure blob and the in-memory store all speak through the
//! `object_store` crate. A [`Connector`] knows how to reach one provider;
//! [`ObjectClient`] wraps it, opening one [`ObjectBackend`] per location and
//! caching it for the lifetime of the client.

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use ferry_core::{BackendClient, FerryError, FerryResult, StorageBackend, StorageKey};
use futures::TryStreamExt;
use object_store::path::Path as ObjectPath;
use object_store::signer::Signer;
use object_store::{ObjectStore, PutPayload};
use reqwest::Method;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Live handles for one location
pub struct Connection {
    pub store: Arc<dyn ObjectStore>,
    /// Present when the store can pre-sign URLs
    pub signer: Option<Arc<dyn Signer>>,
}

/// Builds object-store handles for one provider
pub trait Connector: Send + Sync {
    /// Short provider name used in logs and errors
    fn provider(&self) -> &'static str;

    fn connect(&self, location: &str) -> FerryResult<Connection>;
}

/// One bucket or container
pub struct ObjectBackend {
    id: String,
    provider: &'static str,
    store: Arc<dyn ObjectStore>,
    signer: Option<Arc<dyn Signer>>,
}

impl ObjectBackend {
    pub fn new(provider: &'static str, location: &str, connection: Connection) -> Self {
        Self {
            id: format!("{provider}:{location}"),
            provider,
            store: connection.store,
            signer: connection.signer,
        }
    }

    fn path(key: &StorageKey) -> ObjectPath {
        ObjectPath::from(key.as_str())
    }

    fn map_err(&self, key: &StorageKey, err: object_store::Error) -> FerryError {
        match err {
            object_store::Error::NotFound { .. } => FerryError::NotFound(key.to_string()),
            other => FerryError::backend(self.provider, other),
        }
    }
}

#[async_trait]
impl StorageBackend for ObjectBackend {
    fn id(&self) -> &str {
        &self.id
    }

    fn display_name(&self) -> &str {
        self.provider
    }

    #[instrument(skip(self), fields(backend = %self.id, key = %key))]
    async fn exists(&self, key: &StorageKey) -> FerryResult<bool> {
        match self.store.head(&Self::path(key)).await {
            Ok(_) => Ok(true),
            Err(object_store::Error::NotFound { .. }) => Ok(false),
            Err(e) => Err(FerryError::backend(self.provider, e)),
        }
    }

    #[instrument(skip(self), fields(backend = %self.id, prefix = %prefix))]
    async fn list_prefix(&self, prefix: &StorageKey) -> FerryResult<Vec<StorageKey>> {
        let prefix_path = Self::path(prefix);
        let mut stream = self
            .store
            .list((!prefix.is_empty()).then_some(&prefix_path));

        let mut keys = Vec::new();
        while let Some(meta) = stream
            .try_next()
            .await
            .map_err(|e| FerryError::backend(self.provider, e))?
        {
            keys.push(StorageKey::new(meta.location.to_string()));
        }
        keys.sort();
        Ok(keys)
    }

    #[instrument(skip(self, data), fields(backend = %self.id, key = %key, size = data.len()))]
    async fn put(&self, key: &StorageKey, data: Bytes) -> FerryResult<()> {
        self.store
            .put(&Self::path(key), PutPayload::from(data))
            .await
            .map_err(|e| self.map_err(key, e))?;
        Ok(())
    }

    #[instrument(skip(self), fields(backend = %self.id, key = %key))]
    async fn download(&self, key: &StorageKey) -> FerryResult<Bytes> {
        let result = self
            .store
            .get(&Self::path(key))
            .await
            .map_err(|e| self.map_err(key, e))?;
        result.bytes().await.map_err(|e| self.map_err(key, e))
    }

    /// Missing keys are reported rather than silently ignored.
    #[instrument(skip(self), fields(backend = %self.id, key = %key))]
    async fn delete(&self, key: &StorageKey) -> FerryResult<()> {
        if !self.exists(key).await? {
            return Err(FerryError::NotFound(key.to_string()));
        }
        self.store
            .delete(&Self::path(key))
            .await
            .map_err(|e| self.map_err(key, e))
    }

    #[instrument(skip(self), fields(backend = %self.id, from = %from, to = %to))]
    async fn server_side_copy(&self, from: &StorageKey, to: &StorageKey) -> FerryResult<()> {
        self.store
            .copy(&Self::path(from), &Self::path(to))
            .await
            .map_err(|e| self.map_err(from, e))
    }

    async fn presigned_url(&self, key: &StorageKey, ttl: Duration) -> Option<String> {
        let signer = self.signer.as_ref()?;
        match signer.signed_url(Method::GET, &Self::path(key), ttl).await {
            Ok(url) => Some(url.to_string()),
            Err(e) => {
                warn!(backend = %self.id, key = %key, error = %e, "could not sign url");
                None
            }
        }
    }
}

/// Provider client handing out cached, location-bound backends
pub struct ObjectClient<C> {
    connector: C,
    backends: DashMap<String, Arc<dyn StorageBackend>>,
}

impl<C: Connector> ObjectClient<C> {
    pub fn new(connector: C) -> Self {
        Self {
            connector,
            backends: DashMap::new(),
        }
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    /// Locations opened so far.
    pub fn locations(&self) -> Vec<String> {
        let mut locations: Vec<_> = self.backends.iter().map(|e| e.key().clone()).collect();
        locations.sort();
        locations
    }
}

impl<C: Connector> BackendClient for ObjectClient<C> {
    fn open(&self, location: &str) -> FerryResult<Arc<dyn StorageBackend>> {
        if location.is_empty() {
            return Err(FerryError::Config(format!(
                "no {} location configured",
                self.connector.provider()
            )));
        }
        if let Some(backend) = self.backends.get(location) {
            return Ok(backend.clone());
        }

        let provider = self.connector.provider();
        let connection = self.connector.connect(location)?;
        let backend: Arc<dyn StorageBackend> =
            Arc::new(ObjectBackend::new(provider, location, connection));
        debug!(provider, location, "opened object store location");

        Ok(self
            .backends
            .entry(location.to_string())
            .or_insert(backend)
            .clone())
    }
}
