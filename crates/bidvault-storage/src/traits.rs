//! Presigner abstraction
//!
//! The gates never move file bytes. They only mint short-lived credentials that
//! let a client PUT or GET one object directly against object storage.

use async_trait::async_trait;
use bidvault_core::AppError;
use std::time::Duration;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Presign failed: {0}")]
    PresignFailed(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl StorageError {
    /// Whether retrying the same call may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            StorageError::PresignFailed(_) | StorageError::BackendError(_)
        )
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::InvalidKey(key) => {
                AppError::InvalidInput(format!("Invalid storage key: {}", key))
            }
            other => AppError::CredentialMint(other.to_string()),
        }
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Parameters of a write credential.
#[derive(Debug, Clone)]
pub struct UploadPresignRequest {
    pub key: String,
    pub content_type: String,
    pub expires_in: Duration,
    /// URL-encoded object tag set, e.g. `rfp_id=..&vendor_id=..`
    pub tagging: String,
    /// Request server-side encryption (AES256)
    pub encrypt: bool,
}

/// Mints presigned object-storage URLs.
#[async_trait]
pub trait Presigner: Send + Sync {
    /// Presigned PUT URL for exactly `request.key`.
    async fn presign_upload(&self, request: &UploadPresignRequest) -> StorageResult<String>;

    /// Presigned GET URL for `key` in `bucket`.
    async fn presign_download(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
    ) -> StorageResult<String>;

    /// Headers the client must send with the PUT, since they are part of the signature.
    fn upload_headers(&self, request: &UploadPresignRequest) -> Vec<(String, String)> {
        let mut headers = vec![("Content-Type".to_string(), request.content_type.clone())];
        if request.encrypt {
            headers.push((
                "x-amz-server-side-encryption".to_string(),
                "AES256".to_string(),
            ));
        }
        if !request.tagging.is_empty() {
            headers.push(("x-amz-tagging".to_string(), request.tagging.clone()));
        }
        headers
    }

    /// Bucket new uploads are written to.
    fn bucket(&self) -> &str;
}
