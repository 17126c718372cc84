#[cfg(feature = "storage-s3")]
use crate::S3Presigner;
use crate::{Presigner, StorageError, StorageResult};
use bidvault_core::StorageConfig;
use std::sync::Arc;

/// Create the presigner for the configured bucket
pub async fn create_presigner(config: &StorageConfig) -> StorageResult<Arc<dyn Presigner>> {
    if config.bucket.trim().is_empty() {
        return Err(StorageError::ConfigError(
            "S3_BUCKET not configured".to_string(),
        ));
    }

    #[cfg(feature = "storage-s3")]
    {
        let presigner = S3Presigner::new(
            config.bucket.clone(),
            config.region.clone(),
            config.endpoint.clone(),
        )
        .await?;
        Ok(Arc::new(presigner))
    }

    #[cfg(not(feature = "storage-s3"))]
    {
        Err(StorageError::ConfigError(
            "S3 presigner not available (storage-s3 feature not enabled)".to_string(),
        ))
    }
}
