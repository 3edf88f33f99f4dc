//! Azure blob storage
//!
//! Credentials come from a standard storage connection string
//! (`AccountName=...;AccountKey=...;BlobEndpoint=...`), including the
//! `UseDevelopmentStorage=true` shorthand for the local emulator.

use ferry_core::config::AzureSettings;
use ferry_core::{FerryError, FerryResult};
use object_store::azure::{MicrosoftAzure, MicrosoftAzureBuilder};
use std::sync::Arc;

use crate::object::{Connection, Connector, ObjectClient};

pub type BlobClient = ObjectClient<AzureConnector>;

/// Fields of a storage connection string
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AzureCredentials {
    pub account_name: Option<String>,
    pub account_key: Option<String>,
    pub blob_endpoint: Option<String>,
    pub use_emulator: bool,
    /// `DefaultEndpointsProtocol`, `https` unless stated
    pub protocol: Option<String>,
}

impl AzureCredentials {
    /// Parse `Key=Value;Key=Value`. Keys match case-insensitively, values
    /// keep everything after the first `=` (account keys end in `==`).
    pub fn parse(connection_string: &str) -> FerryResult<Self> {
        let mut creds = Self::default();
        for part in connection_string.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            let mut kv = part.splitn(2, '=');
            let key = kv.next().unwrap_or_default().trim();
            let value = kv
                .next()
                .ok_or_else(|| FerryError::Config(format!("malformed connection string part: {key}")))?
                .trim()
                .to_string();

            match key.to_ascii_lowercase().as_str() {
                "accountname" => creds.account_name = Some(value),
                "accountkey" => creds.account_key = Some(value),
                "blobendpoint" => creds.blob_endpoint = Some(value),
                "defaultendpointsprotocol" => creds.protocol = Some(value),
                "usedevelopmentstorage" => creds.use_emulator = value.eq_ignore_ascii_case("true"),
                _ => {}
            }
        }

        if !creds.use_emulator && creds.account_name.is_none() {
            return Err(FerryError::Config(
                "connection string has no AccountName".to_string(),
            ));
        }
        Ok(creds)
    }

    fn allow_http(&self) -> bool {
        self.protocol.as_deref() == Some("http")
            || self
                .blob_endpoint
                .as_deref()
                .is_some_and(|e| e.starts_with("http://"))
    }
}

pub struct AzureConnector {
    credentials: AzureCredentials,
}

impl AzureConnector {
    pub fn new(credentials: AzureCredentials) -> Self {
        Self { credentials }
    }

    fn builder(&self, container: &str) -> MicrosoftAzureBuilder {
        let c = &self.credentials;
        let mut builder = MicrosoftAzureBuilder::new()
            .with_container_name(container)
            .with_use_emulator(c.use_emulator);

        if let Some(account) = &c.account_name {
            builder = builder.with_account(account);
        }
        if let Some(key) = &c.account_key {
            builder = builder.with_access_key(key);
        }
        if let Some(endpoint) = &c.blob_endpoint {
            builder = builder.with_endpoint(endpoint.clone());
        }
        builder.with_allow_http(c.allow_http())
    }
}

impl Connector for AzureConnector {
    fn provider(&self) -> &'static str {
        "azure"
    }

    fn connect(&self, container: &str) -> FerryResult<Connection> {
        let store: Arc<MicrosoftAzure> = Arc::new(
            self.builder(container)
                .build()
                .map_err(|e| FerryError::backend("azure", e))?,
        );
        Ok(Connection {
            store: store.clone(),
            signer: Some(store),
        })
    }
}

impl ObjectClient<AzureConnector> {
    pub fn from_settings(settings: &AzureSettings) -> FerryResult<Self> {
        let credentials = AzureCredentials::parse(&settings.connection_string)?;
        Ok(Self::new(AzureConnector::new(credentials)))
    }
}
