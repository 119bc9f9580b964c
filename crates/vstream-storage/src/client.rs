//! S3-compatible object store (MinIO, R2, AWS S3).

use std::path::Path;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::{Builder, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{BucketLocationConstraint, CreateBucketConfiguration};
use aws_sdk_s3::Client;
use tracing::{debug, info};

use crate::error::{StorageError, StorageResult};
use crate::store::{ObjectStat, ObjectStore};

/// Configuration for the S3 client.
#[derive(Debug, Clone)]
pub struct S3Config {
    /// Endpoint host with optional port, e.g. `minio:9000`
    pub endpoint: String,
    /// Access key ID
    pub access_key: String,
    /// Secret access key
    pub secret_key: String,
    /// Use https for the API and public URLs
    pub use_ssl: bool,
    /// Region (MinIO accepts any value)
    pub region: String,
    /// Host used in public URLs when it differs from the API endpoint
    pub public_endpoint: Option<String>,
}

impl S3Config {
    /// Create config from environment variables.
    pub fn from_env() -> StorageResult<Self> {
        Ok(Self {
            endpoint: std::env::var("S3_ENDPOINT")
                .map_err(|_| StorageError::config_error("S3_ENDPOINT not set"))?,
            access_key: std::env::var("S3_ACCESS_KEY")
                .map_err(|_| StorageError::config_error("S3_ACCESS_KEY not set"))?,
            secret_key: std::env::var("S3_SECRET_KEY")
                .map_err(|_| StorageError::config_error("S3_SECRET_KEY not set"))?,
            use_ssl: std::env::var("S3_USE_SSL")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
            region: std::env::var("S3_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
            public_endpoint: std::env::var("S3_PUBLIC_ENDPOINT").ok().filter(|s| !s.is_empty()),
        })
    }

    fn scheme(&self) -> &'static str {
        if self.use_ssl {
            "https"
        } else {
            "http"
        }
    }

    /// API endpoint URL.
    pub fn endpoint_url(&self) -> String {
        format!("{}://{}", self.scheme(), self.endpoint.trim_end_matches('/'))
    }

    /// Base for public object URLs: `scheme://endpoint`.
    pub fn public_base_url(&self) -> String {
        let host = self.public_endpoint.as_deref().unwrap_or(&self.endpoint);
        format!("{}://{}", self.scheme(), host.trim_end_matches('/'))
    }
}

/// S3-compatible storage client.
#[derive(Clone)]
pub struct S3ObjectStore {
    client: Client,
    region: String,
}

impl S3ObjectStore {
    /// Create a new client from configuration.
    pub fn new(config: &S3Config) -> StorageResult<Self> {
        if config.endpoint.is_empty() {
            return Err(StorageError::config_error("S3 endpoint is empty"));
        }

        let credentials = Credentials::new(
            &config.access_key,
            &config.secret_key,
            None,
            None,
            "vstream",
        );

        let sdk_config = Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .endpoint_url(config.endpoint_url())
            .region(Region::new(config.region.clone()))
            .credentials_provider(credentials)
            .force_path_style(true)
            .build();

        Ok(Self {
            client: Client::from_conf(sdk_config),
            region: config.region.clone(),
        })
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn bucket_exists(&self, bucket: &str) -> StorageResult<bool> {
        match self.client.head_bucket().bucket(bucket).send().await {
            Ok(_) => Ok(true),
            Err(e) => {
                let not_found = e.as_service_error().map(|se| se.is_not_found()).unwrap_or(false)
                    || e.raw_response().map(|r| r.status().as_u16() == 404).unwrap_or(false);
                if not_found {
                    Ok(false)
                } else {
                    Err(StorageError::AwsSdk(DisplayErrorContext(&e).to_string()))
                }
            }
        }
    }

    async fn create_bucket(&self, bucket: &str) -> StorageResult<()> {
        let mut request = self.client.create_bucket().bucket(bucket);

        // us-east-1 rejects an explicit location constraint
        if self.region != "us-east-1" {
            request = request.create_bucket_configuration(
                CreateBucketConfiguration::builder()
                    .location_constraint(BucketLocationConstraint::from(self.region.as_str()))
                    .build(),
            );
        }

        match request.send().await {
            Ok(_) => {
                info!(bucket = %bucket, "Created bucket");
                Ok(())
            }
            Err(e) => {
                let already = e
                    .as_service_error()
                    .map(|se| se.is_bucket_already_owned_by_you() || se.is_bucket_already_exists())
                    .unwrap_or(false);
                if already {
                    debug!(bucket = %bucket, "Bucket created concurrently");
                    Ok(())
                } else {
                    Err(StorageError::bucket_failed(DisplayErrorContext(&e).to_string()))
                }
            }
        }
    }

    async fn put_file(
        &self,
        bucket: &str,
        key: &str,
        path: &Path,
        content_type: &str,
    ) -> StorageResult<()> {
        debug!("Uploading {} to {}/{}", path.display(), bucket, key);

        let body = ByteStream::from_path(path)
            .await
            .map_err(|e| StorageError::upload_failed(e.to_string()))?;

        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(body)
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| StorageError::upload_failed(DisplayErrorContext(&e).to_string()))?;

        Ok(())
    }

    async fn stat_object(&self, bucket: &str, key: &str) -> StorageResult<ObjectStat> {
        match self.client.head_object().bucket(bucket).key(key).send().await {
            Ok(output) => Ok(ObjectStat {
                key: key.to_string(),
                size: output.content_length().unwrap_or(0).max(0) as u64,
            }),
            Err(e) => {
                if e.as_service_error().map(|se| se.is_not_found()).unwrap_or(false) {
                    Err(StorageError::not_found(key))
                } else {
                    Err(StorageError::AwsSdk(DisplayErrorContext(&e).to_string()))
                }
            }
        }
    }

    fn backend_name(&self) -> &'static str {
        "s3"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> S3Config {
        S3Config {
            endpoint: "minio:9000".to_string(),
            access_key: "key".to_string(),
            secret_key: "secret".to_string(),
            use_ssl: false,
            region: "us-east-1".to_string(),
            public_endpoint: None,
        }
    }

    #[test]
    fn test_endpoint_urls() {
        let mut cfg = config();
        assert_eq!(cfg.endpoint_url(), "http://minio:9000");
        assert_eq!(cfg.public_base_url(), "http://minio:9000");

        cfg.use_ssl = true;
        cfg.public_endpoint = Some("media.example.com/".to_string());
        assert_eq!(cfg.endpoint_url(), "https://minio:9000");
        assert_eq!(cfg.public_base_url(), "https://media.example.com");
    }

    #[test]
    fn test_empty_endpoint_rejected() {
        let mut cfg = config();
        cfg.endpoint.clear();
        assert!(matches!(S3ObjectStore::new(&cfg), Err(StorageError::ConfigError(_))));
    }
}
