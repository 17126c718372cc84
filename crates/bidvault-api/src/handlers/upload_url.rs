use crate::auth::CallerContext;
use crate::error::{ErrorResponse, HttpAppError};
use crate::handlers::parse_submission_type;
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    Json,
};
use bidvault_core::AppError;
use bidvault_services::UploadRequest;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, IntoParams, Validate)]
pub struct UploadUrlQuery {
    /// `technical` or `commercial`
    #[serde(rename = "type")]
    pub submission_type: Option<String>,
    /// Defaults to `submission.pdf`
    #[validate(length(min = 1, max = 255))]
    pub filename: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UploadUrlResponse {
    /// Presigned PUT URL
    pub url: String,
    /// Seconds until the URL expires
    pub expiry: u64,
    pub s3_key: String,
    pub expires_at: DateTime<Utc>,
    /// Headers the PUT must carry; they are part of the signature
    pub headers: BTreeMap<String, String>,
    /// An earlier, still valid URL was returned
    pub reused: bool,
}

#[utoipa::path(
    get,
    path = "/rfp/{rfp_id}/upload-url",
    tag = "bids",
    params(
        ("rfp_id" = Uuid, Path, description = "RFP ID"),
        UploadUrlQuery
    ),
    responses(
        (status = 200, description = "Upload URL issued", body = UploadUrlResponse),
        (status = 400, description = "Missing or invalid submission type or filename", body = ErrorResponse),
        (status = 401, description = "Missing or invalid bearer token", body = ErrorResponse),
        (status = 403, description = "Role, status or deadline check failed", body = ErrorResponse),
        (status = 404, description = "RFP or vendor submission record not found", body = ErrorResponse),
        (status = 409, description = "Submission slot already sealed", body = ErrorResponse),
        (status = 500, description = "Token persistence or signing failure", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(
    skip(state, caller, query),
    fields(user_id = %caller.0.user_id, operation = "get_upload_url")
)]
pub async fn get_upload_url(
    State(state): State<Arc<AppState>>,
    caller: CallerContext,
    Path(rfp_id): Path<Uuid>,
    Query(query): Query<UploadUrlQuery>,
) -> Result<Json<UploadUrlResponse>, HttpAppError> {
    let submission_type = parse_submission_type(query.submission_type.as_deref())?;
    query.validate().map_err(AppError::from)?;

    let issued = state
        .services
        .issuer
        .issue(
            &caller.0,
            UploadRequest {
                rfp_id,
                submission_type,
                file_name: query.filename,
            },
        )
        .await?;

    Ok(Json(UploadUrlResponse {
        url: issued.url,
        expiry: issued.expires_in,
        s3_key: issued.storage_key,
        expires_at: issued.expires_at,
        headers: issued.headers.into_iter().collect(),
        reused: issued.reused,
    }))
}
