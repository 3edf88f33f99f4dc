//! In-process object store
//!
//! Behaves like a bucket service but keeps everything in memory. Stands in
//! for S3 and Azure in the test suites through `ProviderClients::in_memory`.

use ferry_core::FerryResult;
use object_store::memory::InMemory;
use std::sync::Arc;

use crate::object::{Connection, Connector, ObjectClient};

pub type MemoryClient = ObjectClient<MemoryConnector>;

/// Connector handing out a fresh empty store per location
pub struct MemoryConnector {
    provider: &'static str,
}

impl MemoryConnector {
    /// `provider` is the name reported by the backends, so a memory store
    /// can stand in for either cloud.
    pub fn new(provider: &'static str) -> Self {
        Self { provider }
    }
}

impl Connector for MemoryConnector {
    fn provider(&self) -> &'static str {
        self.provider
    }

    fn connect(&self, _location: &str) -> FerryResult<Connection> {
        Ok(Connection {
            store: Arc::new(InMemory::new()),
            signer: None,
        })
    }
}

impl ObjectClient<MemoryConnector> {
    pub fn in_memory(provider: &'static str) -> Self {
        Self::new(MemoryConnector::new(provider))
    }
}
