use async_trait::async_trait;
use aws_sdk_s3::config::retry::RetryConfig;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::Client;
use tracing::debug;

use crate::config::ObjectStoreConfig;
use crate::error::{AppError, Result};

/// Suffix of ingestible log objects
const LOG_SUFFIX: &str = ".json.gz";

/// Key substring marking objects the collector has already archived
const PROCESSED_MARKER: &str = "processed";

/// Transient request failures are retried this many times by the client
const MAX_ATTEMPTS: u32 = 3;

/// Remote store of raw event logs
#[async_trait]
pub trait LogStore: Send + Sync {
    /// List ingestible log objects
    async fn list_log_objects(&self) -> Result<Vec<String>>;

    /// Download an object's raw bytes
    async fn fetch_object(&self, key: &str) -> Result<Vec<u8>>;
}

/// Client for the S3-compatible bucket holding raw event logs
pub struct ObjectStore {
    client: Client,
    bucket: String,
    prefix: String,
}

impl ObjectStore {
    /// Build a client from environment-supplied credentials and endpoint
    pub fn connect(config: &ObjectStoreConfig) -> Self {
        let credentials = Credentials::new(
            &config.access_key,
            &config.secret_key,
            None,
            None,
            "environment",
        );

        let sdk_config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new("auto"))
            .endpoint_url(&config.endpoint)
            .credentials_provider(credentials)
            .retry_config(RetryConfig::standard().with_max_attempts(MAX_ATTEMPTS))
            .force_path_style(true)
            .build();

        Self {
            client: Client::from_conf(sdk_config),
            bucket: config.bucket.clone(),
            prefix: config.prefix.clone(),
        }
    }
}

#[async_trait]
impl LogStore for ObjectStore {
    /// List ingestible log objects under the configured prefix.
    ///
    /// Keys that do not end in `.json.gz`, or that contain `processed`, are
    /// filtered out.
    async fn list_log_objects(&self) -> Result<Vec<String>> {
        let response = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .prefix(&self.prefix)
            .send()
            .await
            .map_err(|e| {
                AppError::ObjectStore(format!(
                    "listing {}/{} failed: {}",
                    self.bucket,
                    self.prefix,
                    DisplayErrorContext(&e)
                ))
            })?;

        let keys: Vec<String> = response
            .contents()
            .iter()
            .filter_map(|object| object.key())
            .filter(|key| key.ends_with(LOG_SUFFIX) && !key.contains(PROCESSED_MARKER))
            .map(|key| key.to_string())
            .collect();

        debug!("listed {} log objects under {}", keys.len(), self.prefix);
        Ok(keys)
    }

    /// Download an object's raw bytes
    async fn fetch_object(&self, key: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                AppError::ObjectStore(format!(
                    "fetching {} failed: {}",
                    key,
                    DisplayErrorContext(&e)
                ))
            })?;

        let bytes = response.body.collect().await.map_err(|e| {
            AppError::ObjectStore(format!("reading body of {} failed: {}", key, e))
        })?;

        Ok(bytes.into_bytes().to_vec())
    }
}
