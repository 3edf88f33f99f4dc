//! Process-wide settings
//!
//! Resolved once at start-up from defaults, an optional TOML file, and the
//! environment, then handed to the clients that need them.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::{
    error::{FerryError, FerryResult},
    path::DEFAULT_ROOT,
    Provider,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Application root every logical path lives under
    pub root: String,
    /// Provider used when a call does not name one
    pub provider: Provider,
    pub azure: AzureSettings,
    pub s3: S3Settings,
    pub disk: DiskSettings,
    pub transfer: TransferSettings,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AzureSettings {
    pub connection_string: String,
    /// Default container
    pub container: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct S3Settings {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub region: String,
    pub endpoint: String,
    /// Default bucket
    pub bucket: String,
    /// Resolve credentials from the standard AWS environment instead
    pub use_aws_environment: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiskSettings {
    /// Local directory the application root is mounted on
    pub mount: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferSettings {
    pub concurrency: usize,
    pub call_timeout_secs: Option<u64>,
    pub retry_failed: bool,
    pub persist_every_file: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            root: DEFAULT_ROOT.to_string(),
            provider: Provider::default(),
            azure: AzureSettings::default(),
            s3: S3Settings::default(),
            disk: DiskSettings::default(),
            transfer: TransferSettings::default(),
        }
    }
}

impl Default for DiskSettings {
    fn default() -> Self {
        Self { mount: PathBuf::from(DEFAULT_ROOT) }
    }
}

impl Default for TransferSettings {
    fn default() -> Self {
        Self {
            concurrency: 1,
            call_timeout_secs: None,
            retry_failed: false,
            persist_every_file: true,
        }
    }
}

impl Settings {
    pub fn from_toml_str(raw: &str) -> FerryResult<Self> {
        toml::from_str(raw).map_err(|e| FerryError::Config(e.to_string()))
    }

    /// Load from `path`, or from the platform config file when it exists,
    /// then apply environment overrides.
    pub fn load(path: Option<&Path>) -> FerryResult<Self> {
        let file = match path {
            Some(p) => Some(p.to_path_buf()),
            None => Self::default_path().filter(|p| p.exists()),
        };

        let mut settings = match file {
            Some(file) => {
                debug!(path = %file.display(), "reading settings file");
                let raw = std::fs::read_to_string(&file).map_err(|e| {
                    FerryError::Config(format!("cannot read {}: {e}", file.display()))
                })?;
                Self::from_toml_str(&raw)?
            }
            None => {
                debug!("no settings file, using defaults");
                Self::default()
            }
        };

        settings.apply_env(|name| std::env::var(name).ok())?;
        Ok(settings)
    }

    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("dev", "ferry", "ferry")
            .map(|d| d.config_dir().join("ferry.toml"))
    }

    /// Override fields from environment-style variables.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> FerryResult<()> {
        if let Some(v) = lookup("FERRY_ROOT") {
            self.root = v;
        }
        if let Some(v) = lookup("FERRY_DISK_MOUNT") {
            self.disk.mount = PathBuf::from(v);
        }
        if let Some(v) = lookup("CLOUD_PROVIDER") {
            self.provider = v.parse()?;
        }
        if let Some(v) = lookup("CONNECTION_STRING") {
            self.azure.connection_string = v;
        }
        if let Some(v) = lookup("CONTAINER") {
            self.azure.container = v;
        }
        if let Some(v) = lookup("S3_ACCESS_KEY_ID") {
            self.s3.access_key_id = v;
        }
        if let Some(v) = lookup("S3_SECRET_ACCESS_KEY") {
            self.s3.secret_access_key = v;
        }
        if let Some(v) = lookup("S3_REGION_NAME") {
            self.s3.region = v;
        }
        if let Some(v) = lookup("S3_ENDPOINT_URL") {
            self.s3.endpoint = v;
        }
        if let Some(v) = lookup("S3_BUCKET_NAME") {
            self.s3.bucket = v;
        }
        if let Some(v) = lookup("AWS_USE") {
            self.s3.use_aws_environment = parse_flag(&v)?;
        }
        Ok(())
    }

    /// Configured default location for `provider`.
    pub fn default_location(&self, provider: Provider) -> &str {
        match provider {
            Provider::Azure => &self.azure.container,
            Provider::Aws => &self.s3.bucket,
        }
    }
}

fn parse_flag(raw: &str) -> FerryResult<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(FerryError::Config(format!("not a boolean: {other}"))),
    }
}
