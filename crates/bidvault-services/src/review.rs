//! Administrator review: submission listings and access history.
//!
//! Listings carry metadata only, never credentials.

use crate::context::Caller;
use bidvault_core::models::{AccessLogEntry, BidSubmission};
use bidvault_core::store::{AccessLogStore, RfpStore, SubmissionStore};
use bidvault_core::{authorize, AppError, Capability};
use std::sync::Arc;
use uuid::Uuid;

pub struct SubmissionReview {
    rfps: Arc<dyn RfpStore>,
    submissions: Arc<dyn SubmissionStore>,
    access_log: Arc<dyn AccessLogStore>,
}

impl SubmissionReview {
    pub fn new(
        rfps: Arc<dyn RfpStore>,
        submissions: Arc<dyn SubmissionStore>,
        access_log: Arc<dyn AccessLogStore>,
    ) -> Self {
        Self {
            rfps,
            submissions,
            access_log,
        }
    }

    /// Submissions of an RFP, newest first.
    #[tracing::instrument(skip(self, caller), fields(user_id = %caller.user_id))]
    pub async fn list_submissions(
        &self,
        caller: &Caller,
        rfp_id: Uuid,
    ) -> Result<Vec<BidSubmission>, AppError> {
        authorize(&caller.roles, Capability::ReviewSubmissions)?;

        if self.rfps.get_rfp(rfp_id).await?.is_none() {
            return Err(AppError::NotFound("RFP not found".to_string()));
        }

        self.submissions.list_for_rfp(rfp_id).await
    }

    /// Access-log entries of a submission, oldest first.
    #[tracing::instrument(skip(self, caller), fields(user_id = %caller.user_id))]
    pub async fn access_history(
        &self,
        caller: &Caller,
        submission_id: Uuid,
    ) -> Result<Vec<AccessLogEntry>, AppError> {
        authorize(&caller.roles, Capability::ReviewSubmissions)?;

        if self.submissions.get_submission(submission_id).await?.is_none() {
            return Err(AppError::NotFound("Bid submission not found".to_string()));
        }

        self.access_log.list_for_submission(submission_id).await
    }
}
