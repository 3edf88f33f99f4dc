//! Ferry Storage
//!
//! One facade over local disk, S3 and Azure blob. Callers speak in
//! [`LogicalPath`]s; the facade turns them into storage keys, picks the
//! backend for the requested provider and location, and routes typed loads
//! and saves through the [`FormatRegistry`].
//!
//! ```no_run
//! # async fn demo(storage: ferry_storage::Storage) -> ferry_core::FerryResult<()> {
//! use ferry_core::{LogicalPath, Provider};
//!
//! let table = storage.cloud().load(&LogicalPath::new("/app/data/example.csv")).await?;
//! storage
//!     .provider(Provider::Azure)
//!     .location("archive")
//!     .save(&LogicalPath::new("/app/data/example.csv"), &table)
//!     .await?;
//! # Ok(())
//! # }
//! ```

mod scope;

pub use scope::StorageScope;

use ferry_core::{FerryResult, PathCodec, Provider, Settings};
use ferry_formats::FormatRegistry;
use ferry_providers::{DiskBackend, ProviderClients};
use std::collections::HashMap;
use std::sync::Arc;

/// Facade entry point, cheap to share behind an `Arc`
pub struct Storage {
    codec: PathCodec,
    default_provider: Provider,
    locations: HashMap<Provider, String>,
    clients: ProviderClients,
    disk: Arc<DiskBackend>,
    formats: FormatRegistry,
}

impl Storage {
    /// Facade over explicit provider clients, with the standard formats.
    pub fn new(settings: &Settings, clients: ProviderClients) -> Self {
        let locations = [Provider::Aws, Provider::Azure]
            .into_iter()
            .map(|p| (p, settings.default_location(p).to_string()))
            .collect();

        Self {
            codec: PathCodec::new(settings.root.as_str()),
            default_provider: settings.provider,
            locations,
            clients,
            disk: Arc::new(DiskBackend::new("disk", &settings.disk.mount)),
            formats: FormatRegistry::standard(),
        }
    }

    /// Facade with real cloud clients built from `settings`.
    pub fn from_settings(settings: &Settings) -> FerryResult<Self> {
        Ok(Self::new(settings, ProviderClients::from_settings(settings)?))
    }

    pub fn with_formats(mut self, formats: FormatRegistry) -> Self {
        self.formats = formats;
        self
    }

    /// Scope on the configured default provider.
    pub fn cloud(&self) -> StorageScope<'_> {
        self.provider(self.default_provider)
    }

    pub fn provider(&self, provider: Provider) -> StorageScope<'_> {
        StorageScope::cloud(self, provider)
    }

    /// Scope on the local disk mount.
    pub fn disk(&self) -> StorageScope<'_> {
        StorageScope::disk(self)
    }

    pub fn codec(&self) -> &PathCodec {
        &self.codec
    }

    pub fn default_provider(&self) -> Provider {
        self.default_provider
    }

    /// Configured bucket or container for `provider`.
    pub fn default_location(&self, provider: Provider) -> &str {
        self.locations.get(&provider).map(String::as_str).unwrap_or_default()
    }

    pub fn disk_backend(&self) -> &Arc<DiskBackend> {
        &self.disk
    }

    pub fn clients(&self) -> &ProviderClients {
        &self.clients
    }

    pub fn formats(&self) -> &FormatRegistry {
        &self.formats
    }
}
