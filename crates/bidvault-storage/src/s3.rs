use crate::traits::{Presigner, StorageError, StorageResult, UploadPresignRequest};
use async_trait::async_trait;
use aws_config::meta::region::RegionProviderChain;
use aws_config::retry::{RetryConfig, RetryMode};
use aws_config::BehaviorVersion;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::types::ServerSideEncryption;
use aws_sdk_s3::Client;
use std::time::Duration;

/// S3 presigner
#[derive(Clone)]
pub struct S3Presigner {
    client: Client,
    bucket: String,
}

impl S3Presigner {
    /// Create a new S3Presigner instance
    ///
    /// # Arguments
    /// * `bucket` - Bucket new uploads are written to
    /// * `region` - AWS region (or region identifier for S3-compatible providers)
    /// * `endpoint_url` - Optional custom endpoint URL for S3-compatible providers
    ///   (e.g., "http://localhost:9000" for MinIO)
    pub async fn new(
        bucket: String,
        region: String,
        endpoint_url: Option<String>,
    ) -> StorageResult<Self> {
        let region_provider = RegionProviderChain::first_try(aws_config::Region::new(region));

        let retry_config = RetryConfig::standard()
            .with_max_attempts(5)
            .with_retry_mode(RetryMode::Adaptive);

        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(region_provider)
            .retry_config(retry_config.clone())
            .load()
            .await;

        let client = if let Some(ref endpoint) = endpoint_url {
            let mut s3_config_builder = aws_sdk_s3::Config::builder()
                .endpoint_url(endpoint)
                .region(config.region().cloned())
                .retry_config(retry_config);
            if let Some(provider) = config.credentials_provider().into_iter().next() {
                s3_config_builder = s3_config_builder.credentials_provider(provider);
            }
            // Path-style addressing is required for MinIO and most S3-compatible providers
            s3_config_builder = s3_config_builder.force_path_style(true);

            Client::from_conf(s3_config_builder.build())
        } else {
            Client::new(&config)
        };

        tracing::info!(bucket = %bucket, endpoint = ?endpoint_url, "S3 presigner initialized");

        Ok(S3Presigner { client, bucket })
    }

    fn presigning_config(expires_in: Duration) -> StorageResult<PresigningConfig> {
        PresigningConfig::builder()
            .expires_in(expires_in)
            .build()
            .map_err(|e| StorageError::ConfigError(e.to_string()))
    }
}

#[async_trait]
impl Presigner for S3Presigner {
    async fn presign_upload(&self, request: &UploadPresignRequest) -> StorageResult<String> {
        let presigning_config = Self::presigning_config(request.expires_in)?;

        let mut put = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(&request.key)
            .content_type(&request.content_type);
        if request.encrypt {
            put = put.server_side_encryption(ServerSideEncryption::Aes256);
        }
        if !request.tagging.is_empty() {
            put = put.tagging(&request.tagging);
        }

        let presigned = put.presigned(presigning_config).await.map_err(|e| {
            tracing::error!(
                error = %e,
                bucket = %self.bucket,
                key = %request.key,
                "S3 presign PUT failed"
            );
            StorageError::PresignFailed(e.to_string())
        })?;

        tracing::debug!(
            bucket = %self.bucket,
            key = %request.key,
            expires_in_secs = request.expires_in.as_secs(),
            "S3 presigned PUT URL generated"
        );

        Ok(presigned.uri().to_string())
    }

    async fn presign_download(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
    ) -> StorageResult<String> {
        let presigning_config = Self::presigning_config(expires_in)?;

        let presigned = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .presigned(presigning_config)
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    bucket = %bucket,
                    key = %key,
                    "S3 presign GET failed"
                );
                StorageError::PresignFailed(e.to_string())
            })?;

        Ok(presigned.uri().to_string())
    }

    fn bucket(&self) -> &str {
        &self.bucket
    }
}
