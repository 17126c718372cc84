//! Persistence traits
//!
//! The gates only talk to the relational store through these traits. The
//! Postgres repositories in `bidvault-db` implement them; tests plug in an
//! in-memory implementation.

use crate::auth::RoleSet;
use crate::error::AppError;
use crate::models::{
    AccessLogEntry, BidSubmission, DownloadAccess, NewUploadToken, RecordedDownload, Rfp,
    SealOutcome, SealedUpload, SubmissionType, UploadToken, VendorSubmission,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

#[async_trait]
pub trait RfpStore: Send + Sync {
    async fn get_rfp(&self, rfp_id: Uuid) -> Result<Option<Rfp>, AppError>;
}

#[async_trait]
pub trait RoleStore: Send + Sync {
    /// Roles held by a user. Unknown role names are dropped.
    async fn roles_for(&self, user_id: Uuid) -> Result<RoleSet, AppError>;
}

#[async_trait]
pub trait VendorSubmissionStore: Send + Sync {
    async fn find_vendor_submission(
        &self,
        rfp_id: Uuid,
        vendor_id: Uuid,
    ) -> Result<Option<VendorSubmission>, AppError>;
}

#[async_trait]
pub trait UploadTokenStore: Send + Sync {
    /// The unused, unexpired token for a slot, if any.
    async fn find_active(
        &self,
        rfp_id: Uuid,
        vendor_id: Uuid,
        submission_type: SubmissionType,
        now: DateTime<Utc>,
    ) -> Result<Option<UploadToken>, AppError>;

    /// Persist a freshly minted token.
    ///
    /// At most one unused token exists per slot. An expired unused token is
    /// replaced; if a concurrent caller already stored a live one, that token
    /// is returned instead of `token`.
    async fn insert_or_adopt(
        &self,
        token: NewUploadToken,
        now: DateTime<Utc>,
    ) -> Result<UploadToken, AppError>;
}

#[async_trait]
pub trait SubmissionStore: Send + Sync {
    async fn get_submission(&self, submission_id: Uuid)
        -> Result<Option<BidSubmission>, AppError>;

    async fn find_by_storage_key(&self, key: &str) -> Result<Option<BidSubmission>, AppError>;

    /// Latest submission of one type for a vendor registration.
    async fn find_for_vendor(
        &self,
        vendor_submission_id: Uuid,
        submission_type: SubmissionType,
    ) -> Result<Option<BidSubmission>, AppError>;

    /// All submissions of an RFP, newest first.
    async fn list_for_rfp(&self, rfp_id: Uuid) -> Result<Vec<BidSubmission>, AppError>;

    /// Seal a completed upload as one unit: create or seal the row for
    /// `upload.key`, flip its unused upload token to used and append the
    /// `sealed` access-log entry. Either all three land or none does.
    ///
    /// An already-sealed row is returned untouched with `newly_sealed == false`.
    async fn record_sealed(&self, upload: SealedUpload) -> Result<SealOutcome, AppError>;

    /// Record a granted download as one unit: set `opened_at`/`opened_by` if
    /// still unset (action `Opened`), otherwise action `Accessed`, and append
    /// the matching access-log entry. Either both land or neither does.
    async fn record_download(&self, access: DownloadAccess)
        -> Result<RecordedDownload, AppError>;
}

/// Read side of the access log. Entries are written by [`SubmissionStore`]
/// in the same unit as the state change they describe.
#[async_trait]
pub trait AccessLogStore: Send + Sync {
    /// Entries for a submission, oldest first.
    async fn list_for_submission(&self, submission_id: Uuid)
        -> Result<Vec<AccessLogEntry>, AppError>;
}
