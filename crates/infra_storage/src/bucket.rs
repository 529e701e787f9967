//! S3-compatible [`ObjectStore`] adapter

use std::time::Instant;

use async_trait::async_trait;
use chrono::Utc;
use s3::creds::Credentials;
use s3::{Bucket, Region};
use tracing::{debug, info, instrument};

use core_kernel::{AdapterHealth, DomainPort, HealthCheckResult, HealthCheckable, PortError};
use domain_claims::attachment::AttachmentType;
use domain_claims::ports::ObjectStore;

use crate::config::S3Config;
use crate::error::StorageError;
use crate::keys::{key_from_url, object_key, object_url};

pub struct S3ObjectStore {
    bucket: Box<Bucket>,
    base_url: String,
    key_prefix: String,
}

impl S3ObjectStore {
    /// Builds the bucket client; no request is made until first use
    pub fn new(config: &S3Config) -> Result<Self, StorageError> {
        let region = Region::Custom {
            region: config.region.clone(),
            endpoint: config.endpoint.clone(),
        };
        let credentials = Credentials::new(
            Some(&config.access_key),
            Some(&config.secret_key),
            None,
            None,
            None,
        )
        .map_err(|e| StorageError::Configuration(e.to_string()))?;

        let mut bucket = Bucket::new(&config.bucket, region, credentials)?;
        if config.path_style {
            bucket = bucket.with_path_style();
        }

        info!(bucket = %config.bucket, endpoint = %config.endpoint, "object store configured");
        Ok(Self {
            bucket,
            base_url: config.base_url(),
            key_prefix: config.key_prefix.clone(),
        })
    }

    fn ensure_success(status: u16, key: &str) -> Result<(), StorageError> {
        if (200..300).contains(&status) {
            return Ok(());
        }
        Err(StorageError::UnexpectedStatus {
            status,
            key: key.to_string(),
        })
    }
}

impl DomainPort for S3ObjectStore {}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    #[instrument(skip(self, content), fields(size = content.len(), kind = %kind))]
    async fn upload_file(
        &self,
        content: &[u8],
        kind: AttachmentType,
        content_type: &str,
    ) -> Result<String, PortError> {
        let key = object_key(&self.key_prefix, kind, content_type);
        let response = self
            .bucket
            .put_object_with_content_type(&key, content, content_type)
            .await
            .map_err(StorageError::from)?;
        Self::ensure_success(response.status_code(), &key)?;

        debug!(key = %key, "object uploaded");
        Ok(object_url(&self.base_url, &key))
    }

    #[instrument(skip(self))]
    async fn delete_file_by_url(&self, url: &str) -> Result<(), PortError> {
        let key = key_from_url(&self.base_url, url)
            .ok_or_else(|| StorageError::ForeignUrl(url.to_string()))?;
        let response = self
            .bucket
            .delete_object(key)
            .await
            .map_err(StorageError::from)?;
        // S3 answers 204 for absent keys as well, so deletes are idempotent
        Self::ensure_success(response.status_code(), key)?;

        debug!(key = %key, "object deleted");
        Ok(())
    }
}

#[async_trait]
impl HealthCheckable for S3ObjectStore {
    async fn health_check(&self) -> HealthCheckResult {
        let started = Instant::now();
        let (status, message) = match self.bucket.exists().await {
            Ok(true) => (AdapterHealth::Healthy, None),
            Ok(false) => (AdapterHealth::Unhealthy, Some("bucket does not exist".to_string())),
            Err(error) => (AdapterHealth::Unhealthy, Some(error.to_string())),
        };

        HealthCheckResult {
            adapter_id: "s3".to_string(),
            status,
            latency_ms: started.elapsed().as_millis() as u64,
            message,
            checked_at: Utc::now(),
        }
    }
}
