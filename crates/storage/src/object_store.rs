//! Object storage over S3/MinIO
//!
//! This module defines the storage boundary the pipeline depends on and its
//! S3 implementation. The pipeline needs only four operations per bucket:
//! create-if-absent, list, get, and put. Retry policy deliberately lives
//! outside this boundary; failures are surfaced as typed errors exactly once.

use crate::{StorageError, StorageResult};
use aws_sdk_s3::{
    config::{Credentials, Region},
    primitives::ByteStream,
    Client,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// S3/MinIO connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct S3Config {
    /// AWS region, "us-east-1" for `MinIO`
    pub region: String,

    /// S3 endpoint (custom for `MinIO`, None for AWS S3)
    pub endpoint: Option<String>,

    /// Access key ID
    pub access_key_id: String,

    /// Secret access key
    pub secret_access_key: String,
}

impl Default for S3Config {
    fn default() -> Self {
        Self {
            region: std::env::var("MINIO_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
            endpoint: Some(
                std::env::var("MINIO_ENDPOINT")
                    .unwrap_or_else(|_| "http://localhost:9000".to_string()),
            ),
            access_key_id: std::env::var("MINIO_ACCESS_KEY")
                .unwrap_or_else(|_| "minioadmin".to_string()),
            secret_access_key: std::env::var("MINIO_SECRET_KEY")
                .unwrap_or_else(|_| "miniodevpassword".to_string()),
        }
    }
}

/// Object storage boundary used by the pipeline
#[async_trait::async_trait]
pub trait ObjectStore: Send + Sync {
    /// Create a bucket if it does not exist yet (idempotent)
    async fn ensure_bucket(&self, bucket: &str) -> StorageResult<()>;

    /// List all object keys in a bucket
    async fn list_keys(&self, bucket: &str) -> StorageResult<Vec<String>>;

    /// Retrieve an object as bytes
    async fn get_object(&self, bucket: &str, key: &str) -> StorageResult<Vec<u8>>;

    /// Store an object from bytes
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        data: &[u8],
        content_type: &str,
    ) -> StorageResult<()>;
}

/// S3/MinIO object storage implementation
pub struct S3ObjectStore {
    client: Client,
}

impl S3ObjectStore {
    /// Create a new S3 object storage client
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint configuration is invalid.
    pub fn new(config: S3Config) -> StorageResult<Self> {
        let credentials = Credentials::new(
            &config.access_key_id,
            &config.secret_access_key,
            None,
            None,
            "video-detect-storage",
        );

        let region = Region::new(config.region.clone());

        let mut s3_config_builder = aws_sdk_s3::Config::builder()
            .credentials_provider(credentials)
            .region(region)
            .behavior_version_latest();

        // Set custom endpoint for MinIO
        if let Some(endpoint) = config.endpoint {
            if endpoint.is_empty() {
                return Err(StorageError::InvalidConfig(
                    "endpoint must not be empty".to_string(),
                ));
            }
            s3_config_builder = s3_config_builder
                .endpoint_url(endpoint)
                .force_path_style(true); // Required for MinIO
        }

        let s3_config = s3_config_builder.build();
        let client = Client::from_conf(s3_config);

        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl ObjectStore for S3ObjectStore {
    async fn ensure_bucket(&self, bucket: &str) -> StorageResult<()> {
        match self.client.head_bucket().bucket(bucket).send().await {
            Ok(_) => {
                debug!("Bucket {} already exists", bucket);
                return Ok(());
            }
            Err(e) => {
                let msg = e.to_string();
                if !msg.contains("NotFound") && !msg.contains("404") {
                    return Err(StorageError::BucketUnavailable(format!("{bucket}: {msg}")));
                }
            }
        }

        match self.client.create_bucket().bucket(bucket).send().await {
            Ok(_) => {
                info!("Created bucket {}", bucket);
                Ok(())
            }
            Err(e) => {
                let msg = e.to_string();
                // A concurrent creator is fine, the bucket exists either way
                if msg.contains("BucketAlreadyOwnedByYou") || msg.contains("BucketAlreadyExists") {
                    Ok(())
                } else {
                    Err(StorageError::BucketUnavailable(format!("{bucket}: {msg}")))
                }
            }
        }
    }

    async fn list_keys(&self, bucket: &str) -> StorageResult<Vec<String>> {
        let response = self
            .client
            .list_objects_v2()
            .bucket(bucket)
            .send()
            .await
            .map_err(|e| StorageError::S3Error(e.to_string()))?;

        let keys = response
            .contents()
            .iter()
            .filter_map(|obj| obj.key().map(std::string::ToString::to_string))
            .collect();

        Ok(keys)
    }

    async fn get_object(&self, bucket: &str, key: &str) -> StorageResult<Vec<u8>> {
        let response = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                if e.to_string().contains("NoSuchKey") {
                    StorageError::NotFound(format!("{bucket}/{key}"))
                } else {
                    StorageError::S3Error(e.to_string())
                }
            })?;

        let bytes = response
            .body
            .collect()
            .await
            .map_err(|e| StorageError::S3Error(e.to_string()))?;

        Ok(bytes.to_vec())
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        data: &[u8],
        content_type: &str,
    ) -> StorageResult<()> {
        let byte_stream = ByteStream::from(data.to_vec());

        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(byte_stream)
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| StorageError::S3Error(e.to_string()))?;

        debug!("Stored {} bytes at {}/{}", data.len(), bucket, key);
        Ok(())
    }
}
