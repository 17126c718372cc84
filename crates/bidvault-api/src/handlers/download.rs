use crate::auth::CallerContext;
use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    Json,
};
use bidvault_core::models::{AccessAction, SubmissionType};
use bidvault_services::OpenedSubmission;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Serialize, ToSchema)]
pub struct DownloadMetadata {
    pub rfp_id: Uuid,
    pub proposal_deadline_passed: bool,
    pub deadline_passed_at: DateTime<Utc>,
    pub accessed_by: Uuid,
    pub accessed_at: DateTime<Utc>,
    /// `opened` for the first download, `accessed` afterwards
    pub access_action: AccessAction,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DownloadResponse {
    /// Presigned GET URL
    pub download_url: String,
    pub expires_in: u64,
    pub file_name: String,
    pub file_size: Option<i64>,
    pub submission_type: SubmissionType,
    pub uploaded_at: DateTime<Utc>,
    pub sealed_at: Option<DateTime<Utc>>,
    pub opened_at: Option<DateTime<Utc>>,
    pub s3_key: String,
    pub metadata: DownloadMetadata,
}

impl DownloadResponse {
    fn new(opened: OpenedSubmission, accessed_by: Uuid) -> Self {
        let submission = opened.submission;
        Self {
            download_url: opened.download_url,
            expires_in: opened.expires_in,
            file_name: submission.file_name,
            file_size: submission.file_size,
            submission_type: submission.submission_type,
            uploaded_at: submission
                .upload_completed_at
                .unwrap_or(submission.created_at),
            sealed_at: submission.sealed_at,
            opened_at: submission.opened_at,
            s3_key: submission.s3_key,
            metadata: DownloadMetadata {
                rfp_id: opened.rfp.id,
                proposal_deadline_passed: true,
                deadline_passed_at: opened.rfp.proposal_due,
                accessed_by,
                accessed_at: opened.accessed_at,
                access_action: opened.action,
            },
        }
    }
}

#[utoipa::path(
    get,
    path = "/bid-submissions/{submission_id}/download",
    tag = "bids",
    params(
        ("submission_id" = Uuid, Path, description = "Bid submission ID")
    ),
    responses(
        (status = 200, description = "Download URL issued", body = DownloadResponse),
        (status = 401, description = "Missing or invalid bearer token", body = ErrorResponse),
        (status = 403, description = "Not an administrator, deadline not passed, or not sealed", body = ErrorResponse),
        (status = 404, description = "Submission or RFP not found", body = ErrorResponse),
        (status = 500, description = "Signing or access logging failure", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(
    skip(state, caller),
    fields(user_id = %caller.0.user_id, operation = "download_bid_submission")
)]
pub async fn download_bid_submission(
    State(state): State<Arc<AppState>>,
    caller: CallerContext,
    Path(submission_id): Path<Uuid>,
) -> Result<Json<DownloadResponse>, HttpAppError> {
    let opened = state.services.gate.open(&caller.0, submission_id).await?;
    Ok(Json(DownloadResponse::new(opened, caller.0.user_id)))
}
