//! Submission status for vendors, listings and access history for administrators.

use crate::auth::CallerContext;
use crate::error::{ErrorResponse, HttpAppError};
use crate::handlers::parse_submission_type;
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    Json,
};
use bidvault_core::models::{AccessLogEntry, BidSubmission, SubmissionType};
use bidvault_services::SubmissionState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

/// Submission metadata. Never carries a storage credential.
#[derive(Debug, Serialize, ToSchema)]
pub struct SubmissionSummary {
    pub id: Uuid,
    pub vendor_submission_id: Uuid,
    pub submission_type: SubmissionType,
    pub file_name: String,
    pub file_size: Option<i64>,
    pub s3_key: String,
    pub sealed: bool,
    pub sealed_at: Option<DateTime<Utc>>,
    pub uploaded_at: Option<DateTime<Utc>>,
    pub opened_at: Option<DateTime<Utc>>,
    pub opened_by: Option<Uuid>,
}

impl From<BidSubmission> for SubmissionSummary {
    fn from(s: BidSubmission) -> Self {
        Self {
            id: s.id,
            vendor_submission_id: s.vendor_submission_id,
            submission_type: s.submission_type,
            file_name: s.file_name,
            file_size: s.file_size,
            s3_key: s.s3_key,
            sealed: s.sealed,
            sealed_at: s.sealed_at,
            uploaded_at: s.upload_completed_at,
            opened_at: s.opened_at,
            opened_by: s.opened_by,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct StatusQuery {
    /// `technical` or `commercial`
    #[serde(rename = "type")]
    pub submission_type: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SubmissionStatusResponse {
    pub status: SubmissionState,
    pub can_upload: bool,
    pub can_access: bool,
    pub deadline_passed: bool,
    pub proposal_due: DateTime<Utc>,
    /// Milliseconds until the deadline, 0 once it has passed
    pub time_remaining_ms: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submission: Option<SubmissionSummary>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SubmissionListResponse {
    pub rfp_id: Uuid,
    pub submissions: Vec<SubmissionSummary>,
    pub total: usize,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AccessLogResponse {
    pub submission_id: Uuid,
    pub entries: Vec<AccessLogEntry>,
}

#[utoipa::path(
    get,
    path = "/rfp/{rfp_id}/submission-status",
    tag = "bids",
    params(
        ("rfp_id" = Uuid, Path, description = "RFP ID"),
        StatusQuery
    ),
    responses(
        (status = 200, description = "Status of the caller's submission slot", body = SubmissionStatusResponse),
        (status = 400, description = "Missing or invalid submission type", body = ErrorResponse),
        (status = 401, description = "Missing or invalid bearer token", body = ErrorResponse),
        (status = 403, description = "Caller has no RFP role", body = ErrorResponse),
        (status = 404, description = "RFP not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(
    skip(state, caller, query),
    fields(user_id = %caller.0.user_id, operation = "get_submission_status")
)]
pub async fn get_submission_status(
    State(state): State<Arc<AppState>>,
    caller: CallerContext,
    Path(rfp_id): Path<Uuid>,
    Query(query): Query<StatusQuery>,
) -> Result<Json<SubmissionStatusResponse>, HttpAppError> {
    let submission_type = parse_submission_type(query.submission_type.as_deref())?;

    let status = state
        .services
        .status
        .status(&caller.0, rfp_id, submission_type)
        .await?;

    Ok(Json(SubmissionStatusResponse {
        status: status.state,
        can_upload: status.can_upload,
        can_access: status.can_access,
        deadline_passed: status.deadline_passed,
        proposal_due: status.proposal_due,
        time_remaining_ms: status.time_remaining_ms,
        submission: status.submission.map(SubmissionSummary::from),
    }))
}

#[utoipa::path(
    get,
    path = "/rfp/{rfp_id}/bid-submissions",
    tag = "review",
    params(
        ("rfp_id" = Uuid, Path, description = "RFP ID")
    ),
    responses(
        (status = 200, description = "Submissions of the RFP, newest first", body = SubmissionListResponse),
        (status = 401, description = "Missing or invalid bearer token", body = ErrorResponse),
        (status = 403, description = "Not an administrator", body = ErrorResponse),
        (status = 404, description = "RFP not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(
    skip(state, caller),
    fields(user_id = %caller.0.user_id, operation = "list_bid_submissions")
)]
pub async fn list_bid_submissions(
    State(state): State<Arc<AppState>>,
    caller: CallerContext,
    Path(rfp_id): Path<Uuid>,
) -> Result<Json<SubmissionListResponse>, HttpAppError> {
    let submissions: Vec<SubmissionSummary> = state
        .services
        .review
        .list_submissions(&caller.0, rfp_id)
        .await?
        .into_iter()
        .map(SubmissionSummary::from)
        .collect();

    Ok(Json(SubmissionListResponse {
        rfp_id,
        total: submissions.len(),
        submissions,
    }))
}

#[utoipa::path(
    get,
    path = "/bid-submissions/{submission_id}/access-log",
    tag = "review",
    params(
        ("submission_id" = Uuid, Path, description = "Bid submission ID")
    ),
    responses(
        (status = 200, description = "Access log entries, oldest first", body = AccessLogResponse),
        (status = 401, description = "Missing or invalid bearer token", body = ErrorResponse),
        (status = 403, description = "Not an administrator", body = ErrorResponse),
        (status = 404, description = "Submission not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(
    skip(state, caller),
    fields(user_id = %caller.0.user_id, operation = "get_access_log")
)]
pub async fn get_access_log(
    State(state): State<Arc<AppState>>,
    caller: CallerContext,
    Path(submission_id): Path<Uuid>,
) -> Result<Json<AccessLogResponse>, HttpAppError> {
    let entries = state
        .services
        .review
        .access_history(&caller.0, submission_id)
        .await?;

    Ok(Json(AccessLogResponse {
        submission_id,
        entries,
    }))
}
