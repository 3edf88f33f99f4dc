//! Storage providers for Ferry
//!
//! Local disk, S3-compatible buckets, Azure blob containers, and an
//! in-memory store, all behind [`ferry_core::StorageBackend`].

pub mod blob;
mod local;
pub mod memory;
pub mod object;
pub mod s3;

pub use blob::{AzureConnector, AzureCredentials, BlobClient};
pub use local::DiskBackend;
pub use memory::{MemoryClient, MemoryConnector};
pub use object::{Connection, Connector, ObjectBackend, ObjectClient};
pub use s3::{S3Client, S3Connector};

use ferry_core::{BackendClient, FerryError, FerryResult, Provider, Settings, StorageBackend};
use std::collections::HashMap;
use std::sync::Arc;

/// Registry of provider clients
pub struct ProviderClients {
    clients: HashMap<Provider, Arc<dyn BackendClient>>,
}

impl ProviderClients {
    pub fn new() -> Self {
        Self { clients: HashMap::new() }
    }

    /// Clients for every provider with usable settings. Azure is skipped
    /// when no connection string is configured.
    pub fn from_settings(settings: &Settings) -> FerryResult<Self> {
        let mut clients = Self::new();
        clients.register(Provider::Aws, Arc::new(S3Client::from_settings(&settings.s3)));
        if !settings.azure.connection_string.is_empty() {
            clients.register(
                Provider::Azure,
                Arc::new(BlobClient::from_settings(&settings.azure)?),
            );
        }
        Ok(clients)
    }

    /// In-memory stand-ins for both providers.
    pub fn in_memory() -> Self {
        let mut clients = Self::new();
        clients.register(Provider::Aws, Arc::new(MemoryClient::in_memory("s3")));
        clients.register(Provider::Azure, Arc::new(MemoryClient::in_memory("azure")));
        clients
    }

    pub fn register(&mut self, provider: Provider, client: Arc<dyn BackendClient>) {
        self.clients.insert(provider, client);
    }

    pub fn get(&self, provider: Provider) -> Option<Arc<dyn BackendClient>> {
        self.clients.get(&provider).cloned()
    }

    pub fn get_or_err(&self, provider: Provider) -> FerryResult<Arc<dyn BackendClient>> {
        self.get(provider)
            .ok_or_else(|| FerryError::Config(format!("{provider} is not configured")))
    }

    /// Backend for `location` on `provider`.
    pub fn open(&self, provider: Provider, location: &str) -> FerryResult<Arc<dyn StorageBackend>> {
        self.get_or_err(provider)?.open(location)
    }

    pub fn list(&self) -> Vec<Provider> {
        let mut providers: Vec<_> = self.clients.keys().copied().collect();
        providers.sort_by_key(|p| p.as_str());
        providers
    }
}

impl Default for ProviderClients {
    fn default() -> Self {
        Self::new()
    }
}
