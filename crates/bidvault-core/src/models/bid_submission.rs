use super::access_log::AccessLogEntry;
use super::upload_token::SubmissionType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// A vendor's registration against an RFP. Uploads require one.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct VendorSubmission {
    pub id: Uuid,
    pub rfp_id: Uuid,
    pub vendor_id: Uuid,
    pub vendor_name: String,
}

/// One uploaded bid file.
///
/// Immutable once sealed, except for `opened_at`/`opened_by` which move from
/// `None` to a value exactly once.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BidSubmission {
    pub id: Uuid,
    pub rfp_id: Uuid,
    pub vendor_submission_id: Uuid,
    pub submission_type: SubmissionType,
    pub s3_bucket: String,
    pub s3_key: String,
    pub s3_etag: Option<String>,
    pub file_name: String,
    pub file_size: Option<i64>,
    pub sealed: bool,
    pub sealed_at: Option<DateTime<Utc>>,
    pub upload_completed_at: Option<DateTime<Utc>>,
    pub opened_at: Option<DateTime<Utc>>,
    pub opened_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// A completed object-storage write, as reported by the storage event feed.
#[derive(Debug, Clone)]
pub struct SealedUpload {
    pub rfp_id: Uuid,
    pub vendor_submission_id: Uuid,
    pub submission_type: SubmissionType,
    pub bucket: String,
    pub key: String,
    pub etag: Option<String>,
    pub file_name: String,
    pub file_size: Option<i64>,
    pub sealed_at: DateTime<Utc>,
    /// Stored on the `sealed` access-log entry
    pub log_metadata: serde_json::Value,
}

/// Result of sealing one completed upload.
#[derive(Debug, Clone)]
pub struct SealOutcome {
    pub submission: BidSubmission,
    /// False when the row was already sealed and nothing was written
    pub newly_sealed: bool,
    /// Upload tokens flipped to used
    pub tokens_used: u64,
    pub entry: Option<AccessLogEntry>,
}
