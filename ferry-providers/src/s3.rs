//! S3-compatible object storage
//!
//! Works with AWS S3 and any S3-compatible service (MinIO, Ceph RGW, ...)
//! reachable through a custom endpoint.

use ferry_core::config::S3Settings;
use ferry_core::{FerryError, FerryResult};
use object_store::aws::{AmazonS3, AmazonS3Builder};
use std::sync::Arc;

use crate::object::{Connection, Connector, ObjectClient};

pub type S3Client = ObjectClient<S3Connector>;

pub struct S3Connector {
    settings: S3Settings,
}

impl S3Connector {
    pub fn new(settings: S3Settings) -> Self {
        Self { settings }
    }

    fn builder(&self, bucket: &str) -> AmazonS3Builder {
        let s = &self.settings;
        let mut builder = if s.use_aws_environment {
            AmazonS3Builder::from_env()
        } else {
            AmazonS3Builder::new()
        };
        builder = builder.with_bucket_name(bucket);

        if !s.region.is_empty() {
            builder = builder.with_region(&s.region);
        }
        if !s.access_key_id.is_empty() {
            builder = builder
                .with_access_key_id(&s.access_key_id)
                .with_secret_access_key(&s.secret_access_key);
        }
        if !s.endpoint.is_empty() {
            builder = builder
                .with_endpoint(&s.endpoint)
                .with_allow_http(s.endpoint.starts_with("http://"));
        }
        builder
    }
}

impl Connector for S3Connector {
    fn provider(&self) -> &'static str {
        "s3"
    }

    fn connect(&self, bucket: &str) -> FerryResult<Connection> {
        let store: Arc<AmazonS3> = Arc::new(
            self.builder(bucket)
                .build()
                .map_err(|e| FerryError::backend("s3", e))?,
        );
        Ok(Connection {
            store: store.clone(),
            signer: Some(store),
        })
    }
}

impl ObjectClient<S3Connector> {
    pub fn from_settings(settings: &S3Settings) -> Self {
        Self::new(S3Connector::new(settings.clone()))
    }
}
