//! Submission status for one slot, as seen by the caller.

use crate::context::Caller;
use bidvault_core::deadline::remaining_ms;
use bidvault_core::models::{BidSubmission, SubmissionType};
use bidvault_core::store::{RfpStore, SubmissionStore, UploadTokenStore, VendorSubmissionStore};
use bidvault_core::{authorize, AppError, Capability, Clock, Role};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionState {
    /// Nothing uploaded and no live upload credential
    Pending,
    /// A live upload credential exists, no completed upload yet
    Uploading,
    /// Upload recorded but not sealed
    Uploaded,
    /// Sealed, deadline passed, not opened yet
    Sealed,
    /// Sealed, deadline still ahead
    AwaitingDeadline,
    /// Opened by an administrator
    Opened,
}

#[derive(Debug, Clone)]
pub struct SubmissionStatus {
    pub state: SubmissionState,
    pub can_upload: bool,
    pub can_access: bool,
    pub deadline_passed: bool,
    pub proposal_due: DateTime<Utc>,
    pub time_remaining_ms: i64,
    pub submission: Option<BidSubmission>,
}

/// Classify a slot from its latest submission.
pub fn classify(
    submission: Option<&BidSubmission>,
    has_live_token: bool,
    deadline_passed: bool,
) -> SubmissionState {
    match submission {
        None if has_live_token => SubmissionState::Uploading,
        None => SubmissionState::Pending,
        Some(s) if !s.sealed => SubmissionState::Uploaded,
        Some(s) if s.opened_at.is_some() => SubmissionState::Opened,
        Some(_) if deadline_passed => SubmissionState::Sealed,
        Some(_) => SubmissionState::AwaitingDeadline,
    }
}

pub struct SubmissionStatusService {
    rfps: Arc<dyn RfpStore>,
    vendors: Arc<dyn VendorSubmissionStore>,
    tokens: Arc<dyn UploadTokenStore>,
    submissions: Arc<dyn SubmissionStore>,
    clock: Arc<dyn Clock>,
}

impl SubmissionStatusService {
    pub fn new(
        rfps: Arc<dyn RfpStore>,
        vendors: Arc<dyn VendorSubmissionStore>,
        tokens: Arc<dyn UploadTokenStore>,
        submissions: Arc<dyn SubmissionStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            rfps,
            vendors,
            tokens,
            submissions,
            clock,
        }
    }

    #[tracing::instrument(skip(self, caller), fields(user_id = %caller.user_id))]
    pub async fn status(
        &self,
        caller: &Caller,
        rfp_id: Uuid,
        submission_type: SubmissionType,
    ) -> Result<SubmissionStatus, AppError> {
        authorize(&caller.roles, Capability::IssueUploadToken)?;

        let rfp = self
            .rfps
            .get_rfp(rfp_id)
            .await?
            .ok_or_else(|| AppError::NotFound("RFP not found".to_string()))?;

        let now = self.clock.now();
        let phase = rfp.phase_at(now);
        let deadline_passed = phase.downloads_allowed();

        let vendor = self
            .vendors
            .find_vendor_submission(rfp.id, caller.user_id)
            .await?;

        let submission = match &vendor {
            Some(v) => self.submissions.find_for_vendor(v.id, submission_type).await?,
            None => None,
        };

        let has_live_token = submission.is_none()
            && self
                .tokens
                .find_active(rfp.id, caller.user_id, submission_type, now)
                .await?
                .is_some();

        let is_vendor = caller.roles.contains(Role::Vendor);
        let slot_sealed = submission.as_ref().is_some_and(|s| s.sealed);
        let can_upload = rfp.accepts_submissions()
            && phase.uploads_allowed()
            && (!is_vendor || vendor.is_some())
            && !slot_sealed;
        let can_access = caller.roles.contains(Role::Admin) && deadline_passed && slot_sealed;

        Ok(SubmissionStatus {
            state: classify(submission.as_ref(), has_live_token, deadline_passed),
            can_upload,
            can_access,
            deadline_passed,
            proposal_due: rfp.proposal_due,
            time_remaining_ms: remaining_ms(rfp.proposal_due, now),
            submission,
        })
    }
}
