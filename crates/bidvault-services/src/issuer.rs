//! Upload Token Issuer
//!
//! Grants a vendor (or an administrator) a temporary write credential for one
//! submission slot `(rfp, vendor, submission type)`. Preconditions are checked
//! in order and short-circuit:
//!
//! 1. caller may issue upload tokens (vendor or admin)
//! 2. the RFP exists
//! 3. the RFP is `published` or `open`
//! 4. `now <= proposal_due`
//! 5. vendors have a submission record on the RFP
//! 6. the slot holds no sealed submission
//!
//! A live unused token for the slot is handed back as is. Otherwise a new
//! credential is minted and persisted before it is returned. A sealed object
//! key is never signed for writing again.

use crate::audit::{AuditEventType, AuditLogEntry};
use crate::context::Caller;
use crate::retry::RetryPolicy;
use bidvault_core::constants::DEFAULT_SUBMISSION_FILENAME;
use bidvault_core::models::{NewUploadToken, SubmissionType, UploadToken};
use bidvault_core::store::{RfpStore, SubmissionStore, UploadTokenStore, VendorSubmissionStore};
use bidvault_core::{authorize, AppError, Capability, Clock, Role};
use bidvault_storage::{
    content_type_for, derive_storage_key, submission_tagging, Presigner, UploadPresignRequest,
};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub rfp_id: Uuid,
    pub submission_type: SubmissionType,
    /// Requested file name; defaults to `submission.pdf`
    pub file_name: Option<String>,
}

/// Credential handed to the client.
#[derive(Debug, Clone)]
pub struct IssuedUpload {
    pub url: String,
    /// Seconds of validity left
    pub expires_in: u64,
    pub storage_key: String,
    pub expires_at: DateTime<Utc>,
    /// Headers the PUT must carry
    pub headers: Vec<(String, String)>,
    /// Whether an existing token was returned
    pub reused: bool,
}

pub struct UploadTokenIssuer {
    rfps: Arc<dyn RfpStore>,
    vendors: Arc<dyn VendorSubmissionStore>,
    tokens: Arc<dyn UploadTokenStore>,
    submissions: Arc<dyn SubmissionStore>,
    presigner: Arc<dyn Presigner>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    retry: RetryPolicy,
}

impl UploadTokenIssuer {
    pub fn new(
        rfps: Arc<dyn RfpStore>,
        vendors: Arc<dyn VendorSubmissionStore>,
        tokens: Arc<dyn UploadTokenStore>,
        submissions: Arc<dyn SubmissionStore>,
        presigner: Arc<dyn Presigner>,
        clock: Arc<dyn Clock>,
        ttl: Duration,
    ) -> Self {
        Self {
            rfps,
            vendors,
            tokens,
            submissions,
            presigner,
            clock,
            ttl,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn presign_request(&self, token: &UploadToken, file_name: &str) -> UploadPresignRequest {
        UploadPresignRequest {
            key: token.storage_key.clone(),
            content_type: content_type_for(file_name).to_string(),
            expires_in: self.ttl,
            tagging: submission_tagging(token.rfp_id, token.vendor_id, token.submission_type),
            encrypt: true,
        }
    }

    #[tracing::instrument(
        skip(self, caller, request),
        fields(
            rfp_id = %request.rfp_id,
            user_id = %caller.user_id,
            submission_type = %request.submission_type,
            operation = "issue_upload_token"
        )
    )]
    pub async fn issue(
        &self,
        caller: &Caller,
        request: UploadRequest,
    ) -> Result<IssuedUpload, AppError> {
        authorize(&caller.roles, Capability::IssueUploadToken)?;

        let rfp = self
            .rfps
            .get_rfp(request.rfp_id)
            .await?
            .ok_or_else(|| AppError::NotFound("RFP not found".to_string()))?;

        if !rfp.accepts_submissions() {
            return Err(AppError::SubmissionsClosed {
                status: rfp.status.clone(),
            });
        }

        let now = self.clock.now();
        if !rfp.phase_at(now).uploads_allowed() {
            return Err(AppError::DeadlinePassed {
                proposal_due: rfp.proposal_due,
            });
        }

        let vendor = self
            .vendors
            .find_vendor_submission(rfp.id, caller.user_id)
            .await?;
        if caller.roles.contains(Role::Vendor) && vendor.is_none() {
            return Err(AppError::NoSubmissionRecord);
        }

        if let Some(vendor) = &vendor {
            if self
                .submissions
                .find_for_vendor(vendor.id, request.submission_type)
                .await?
                .is_some_and(|s| s.sealed)
            {
                return Err(AppError::AlreadySealed);
            }
        }

        if let Some(existing) = self
            .tokens
            .find_active(rfp.id, caller.user_id, request.submission_type, now)
            .await?
        {
            return Ok(self.reuse(caller, existing, now));
        }

        let file_name = request
            .file_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(DEFAULT_SUBMISSION_FILENAME);
        let storage_key = derive_storage_key(
            rfp.id,
            caller.user_id,
            request.submission_type,
            file_name,
            now.date_naive(),
        );
        if self
            .submissions
            .find_by_storage_key(&storage_key)
            .await?
            .is_some_and(|s| s.sealed)
        {
            return Err(AppError::AlreadySealed);
        }
        let sanitized_name = storage_key.rsplit('/').next().unwrap_or(file_name);

        let presign = UploadPresignRequest {
            key: storage_key.clone(),
            content_type: content_type_for(sanitized_name).to_string(),
            expires_in: self.ttl,
            tagging: submission_tagging(rfp.id, caller.user_id, request.submission_type),
            encrypt: true,
        };
        let presigner = self.presigner.as_ref();
        let url = self
            .retry
            .run("presign_upload", || presigner.presign_upload(&presign))
            .await?;

        let expires_at = now + ChronoDuration::seconds(self.ttl.as_secs() as i64);
        let stored = self
            .tokens
            .insert_or_adopt(
                NewUploadToken {
                    rfp_id: rfp.id,
                    vendor_id: caller.user_id,
                    submission_type: request.submission_type,
                    storage_key,
                    presigned_url: url.clone(),
                    expires_at,
                    created_by: caller.user_id,
                    ip_address: caller.ip_address.clone(),
                    user_agent: caller.user_agent.clone(),
                },
                now,
            )
            .await
            .map_err(|e| match e {
                AppError::TokenPersist(_) => e,
                other => AppError::TokenPersist(other.to_string()),
            })?;

        if stored.presigned_url != url {
            // A concurrent request won the slot; hand out its token instead.
            return Ok(self.reuse(caller, stored, now));
        }

        AuditLogEntry::new(AuditEventType::UploadTokenIssued)
            .at(now)
            .with_user_id(Some(caller.user_id))
            .with_rfp_id(rfp.id)
            .with_client(caller.ip_address.clone(), caller.user_agent.clone())
            .with_details(serde_json::json!({
                "s3_key": stored.storage_key,
                "submission_type": stored.submission_type,
                "expires_at": stored.expires_at,
            }))
            .log();

        Ok(IssuedUpload {
            headers: self.presigner.upload_headers(&presign),
            url: stored.presigned_url,
            expires_in: self.ttl.as_secs(),
            storage_key: stored.storage_key,
            expires_at: stored.expires_at,
            reused: false,
        })
    }

    fn reuse(&self, caller: &Caller, token: UploadToken, now: DateTime<Utc>) -> IssuedUpload {
        let file_name = token.storage_key.rsplit('/').next().unwrap_or_default();
        let headers = self
            .presigner
            .upload_headers(&self.presign_request(&token, file_name));

        AuditLogEntry::new(AuditEventType::UploadTokenReused)
            .at(now)
            .with_user_id(Some(caller.user_id))
            .with_rfp_id(token.rfp_id)
            .with_client(caller.ip_address.clone(), caller.user_agent.clone())
            .with_details(serde_json::json!({ "s3_key": token.storage_key }))
            .log();

        IssuedUpload {
            expires_in: token.remaining_secs(now),
            url: token.presigned_url,
            storage_key: token.storage_key,
            expires_at: token.expires_at,
            headers,
            reused: true,
        }
    }
}
