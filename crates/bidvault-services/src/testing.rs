//! In-memory stores and a recording presigner.
//!
//! Available to this crate's tests and, with the `testing` feature, to
//! downstream crates that want to drive the services without Postgres or S3.

use crate::context::Stores;
use async_trait::async_trait;
use bidvault_core::models::{
    AccessAction, AccessLogEntry, BidSubmission, DownloadAccess, NewAccessLogEntry,
    NewUploadToken, RecordedDownload, Rfp, SealOutcome, SealedUpload, SubmissionType,
    UploadToken, VendorSubmission,
};
use bidvault_core::store::{
    AccessLogStore, RfpStore, RoleStore, SubmissionStore, UploadTokenStore, VendorSubmissionStore,
};
use bidvault_core::{AppError, RoleSet};
use bidvault_storage::{Presigner, StorageError, StorageResult, UploadPresignRequest};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use uuid::Uuid;

#[derive(Default)]
struct State {
    rfps: HashMap<Uuid, Rfp>,
    roles: HashMap<Uuid, Vec<String>>,
    vendors: Vec<VendorSubmission>,
    tokens: Vec<UploadToken>,
    submissions: Vec<BidSubmission>,
    access_log: Vec<AccessLogEntry>,
    fail_token_writes: bool,
    fail_access_log: bool,
}

/// Single in-memory backing for every store trait.
#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
}

impl InMemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn stores(self: &Arc<Self>) -> Stores {
        Stores {
            rfps: self.clone(),
            roles: self.clone(),
            vendors: self.clone(),
            tokens: self.clone(),
            submissions: self.clone(),
            access_log: self.clone(),
        }
    }

    pub fn insert_rfp(&self, proposal_due: DateTime<Utc>, status: &str) -> Rfp {
        let rfp = Rfp {
            id: Uuid::new_v4(),
            proposal_due,
            status: status.to_string(),
        };
        self.lock().rfps.insert(rfp.id, rfp.clone());
        rfp
    }

    pub fn grant_role(&self, user_id: Uuid, role: &str) {
        self.lock()
            .roles
            .entry(user_id)
            .or_default()
            .push(role.to_string());
    }

    pub fn register_vendor(&self, rfp_id: Uuid, vendor_id: Uuid) -> VendorSubmission {
        let record = VendorSubmission {
            id: Uuid::new_v4(),
            rfp_id,
            vendor_id,
            vendor_name: format!("Vendor {}", &vendor_id.to_string()[..8]),
        };
        self.lock().vendors.push(record.clone());
        record
    }

    /// Add a submission row directly, bypassing the sealer.
    pub fn insert_submission(
        &self,
        vendor: &VendorSubmission,
        submission_type: SubmissionType,
        sealed_at: Option<DateTime<Utc>>,
    ) -> BidSubmission {
        let created_at = sealed_at.unwrap_or_else(Utc::now);
        let submission = BidSubmission {
            id: Uuid::new_v4(),
            rfp_id: vendor.rfp_id,
            vendor_submission_id: vendor.id,
            submission_type,
            s3_bucket: "oc-bids".to_string(),
            s3_key: format!(
                "rfp/{}/{}/{}/{}/bid.pdf",
                vendor.rfp_id,
                created_at.format("%Y-%m-%d"),
                vendor.vendor_id,
                submission_type
            ),
            s3_etag: Some("\"d41d8cd98f00b204e9800998ecf8427e\"".to_string()),
            file_name: "bid.pdf".to_string(),
            file_size: Some(1024),
            sealed: sealed_at.is_some(),
            sealed_at,
            upload_completed_at: sealed_at,
            opened_at: None,
            opened_by: None,
            created_at,
        };
        self.lock().submissions.push(submission.clone());
        submission
    }

    pub fn submission(&self, id: Uuid) -> Option<BidSubmission> {
        self.lock().submissions.iter().find(|s| s.id == id).cloned()
    }

    pub fn tokens(&self) -> Vec<UploadToken> {
        self.lock().tokens.clone()
    }

    pub fn access_log(&self) -> Vec<AccessLogEntry> {
        self.lock().access_log.clone()
    }

    /// Make token inserts fail as a database outage would.
    pub fn fail_token_writes(&self, fail: bool) {
        self.lock().fail_token_writes = fail;
    }

    /// Make access-log writes fail; the state change they belong to is rolled back.
    pub fn fail_access_log(&self, fail: bool) {
        self.lock().fail_access_log = fail;
    }
}

#[async_trait]
impl RfpStore for InMemoryStore {
    async fn get_rfp(&self, rfp_id: Uuid) -> Result<Option<Rfp>, AppError> {
        Ok(self.lock().rfps.get(&rfp_id).cloned())
    }
}

#[async_trait]
impl RoleStore for InMemoryStore {
    async fn roles_for(&self, user_id: Uuid) -> Result<RoleSet, AppError> {
        Ok(self
            .lock()
            .roles
            .get(&user_id)
            .map(RoleSet::from_names)
            .unwrap_or_default())
    }
}

#[async_trait]
impl VendorSubmissionStore for InMemoryStore {
    async fn find_vendor_submission(
        &self,
        rfp_id: Uuid,
        vendor_id: Uuid,
    ) -> Result<Option<VendorSubmission>, AppError> {
        Ok(self
            .lock()
            .vendors
            .iter()
            .find(|v| v.rfp_id == rfp_id && v.vendor_id == vendor_id)
            .cloned())
    }
}

#[async_trait]
impl UploadTokenStore for InMemoryStore {
    async fn find_active(
        &self,
        rfp_id: Uuid,
        vendor_id: Uuid,
        submission_type: SubmissionType,
        now: DateTime<Utc>,
    ) -> Result<Option<UploadToken>, AppError> {
        Ok(self
            .lock()
            .tokens
            .iter()
            .find(|t| {
                t.rfp_id == rfp_id
                    && t.vendor_id == vendor_id
                    && t.submission_type == submission_type
                    && t.is_active(now)
            })
            .cloned())
    }

    async fn insert_or_adopt(
        &self,
        token: NewUploadToken,
        now: DateTime<Utc>,
    ) -> Result<UploadToken, AppError> {
        let mut state = self.lock();
        if state.fail_token_writes {
            return Err(AppError::TokenPersist("connection reset".to_string()));
        }

        let open_slot = state.tokens.iter().position(|t| {
            t.rfp_id == token.rfp_id
                && t.vendor_id == token.vendor_id
                && t.submission_type == token.submission_type
                && !t.used
        });

        if let Some(idx) = open_slot {
            if state.tokens[idx].expires_at > now {
                return Ok(state.tokens[idx].clone());
            }
            state.tokens.remove(idx);
        }

        let stored = UploadToken {
            id: Uuid::new_v4(),
            rfp_id: token.rfp_id,
            vendor_id: token.vendor_id,
            submission_type: token.submission_type,
            storage_key: token.storage_key,
            presigned_url: token.presigned_url,
            expires_at: token.expires_at,
            used: false,
            created_by: token.created_by,
            ip_address: token.ip_address,
            user_agent: token.user_agent,
            created_at: now,
            used_at: None,
        };
        state.tokens.push(stored.clone());
        Ok(stored)
    }
}

#[async_trait]
impl SubmissionStore for InMemoryStore {
    async fn get_submission(
        &self,
        submission_id: Uuid,
    ) -> Result<Option<BidSubmission>, AppError> {
        Ok(self.submission(submission_id))
    }

    async fn find_by_storage_key(&self, key: &str) -> Result<Option<BidSubmission>, AppError> {
        Ok(self
            .lock()
            .submissions
            .iter()
            .find(|s| s.s3_key == key)
            .cloned())
    }

    async fn find_for_vendor(
        &self,
        vendor_submission_id: Uuid,
        submission_type: SubmissionType,
    ) -> Result<Option<BidSubmission>, AppError> {
        Ok(self
            .lock()
            .submissions
            .iter()
            .filter(|s| {
                s.vendor_submission_id == vendor_submission_id
                    && s.submission_type == submission_type
            })
            .max_by_key(|s| s.created_at)
            .cloned())
    }

    async fn list_for_rfp(&self, rfp_id: Uuid) -> Result<Vec<BidSubmission>, AppError> {
        let mut list: Vec<BidSubmission> = self
            .lock()
            .submissions
            .iter()
            .filter(|s| s.rfp_id == rfp_id)
            .cloned()
            .collect();
        list.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(list)
    }

    async fn record_sealed(&self, upload: SealedUpload) -> Result<SealOutcome, AppError> {
        let mut state = self.lock();
        let existing = state.submissions.iter().position(|s| s.s3_key == upload.key);
        if let Some(idx) = existing {
            if state.submissions[idx].sealed {
                return Ok(SealOutcome {
                    submission: state.submissions[idx].clone(),
                    newly_sealed: false,
                    tokens_used: 0,
                    entry: None,
                });
            }
        }
        if state.fail_access_log {
            return Err(AppError::Internal("access log unavailable".to_string()));
        }

        let submission = match existing {
            Some(idx) => {
                let row = &mut state.submissions[idx];
                row.s3_etag = upload.etag;
                row.file_size = upload.file_size;
                row.sealed = true;
                row.sealed_at = Some(upload.sealed_at);
                row.upload_completed_at = Some(upload.sealed_at);
                row.clone()
            }
            None => {
                let row = BidSubmission {
                    id: Uuid::new_v4(),
                    rfp_id: upload.rfp_id,
                    vendor_submission_id: upload.vendor_submission_id,
                    submission_type: upload.submission_type,
                    s3_bucket: upload.bucket,
                    s3_key: upload.key.clone(),
                    s3_etag: upload.etag,
                    file_name: upload.file_name,
                    file_size: upload.file_size,
                    sealed: true,
                    sealed_at: Some(upload.sealed_at),
                    upload_completed_at: Some(upload.sealed_at),
                    opened_at: None,
                    opened_by: None,
                    created_at: upload.sealed_at,
                };
                state.submissions.push(row.clone());
                row
            }
        };

        let mut tokens_used = 0;
        for token in state
            .tokens
            .iter_mut()
            .filter(|t| t.storage_key == upload.key && !t.used)
        {
            token.used = true;
            token.used_at = Some(upload.sealed_at);
            tokens_used += 1;
        }

        let entry = push_entry(
            &mut state,
            NewAccessLogEntry {
                submission_id: submission.id,
                action: AccessAction::Sealed,
                user_id: None,
                metadata: upload.log_metadata,
            },
        );

        Ok(SealOutcome {
            submission,
            newly_sealed: true,
            tokens_used,
            entry: Some(entry),
        })
    }

    async fn record_download(
        &self,
        access: DownloadAccess,
    ) -> Result<RecordedDownload, AppError> {
        let mut state = self.lock();
        let idx = state
            .submissions
            .iter()
            .position(|s| s.id == access.submission_id)
            .ok_or_else(|| AppError::NotFound("Bid submission not found".to_string()))?;
        if !state.submissions[idx].sealed {
            return Err(AppError::NotSealed);
        }
        if state.fail_access_log {
            return Err(AppError::Internal("access log unavailable".to_string()));
        }

        let row = &mut state.submissions[idx];
        let action = if row.opened_at.is_none() {
            row.opened_at = Some(access.at);
            row.opened_by = Some(access.user_id);
            AccessAction::Opened
        } else {
            AccessAction::Accessed
        };
        let submission = row.clone();

        let entry = push_entry(&mut state, access.entry_for(action));
        Ok(RecordedDownload {
            action,
            submission,
            entry,
        })
    }
}

fn push_entry(state: &mut State, entry: NewAccessLogEntry) -> AccessLogEntry {
    let stored = AccessLogEntry {
        id: Uuid::new_v4(),
        submission_id: entry.submission_id,
        action: entry.action,
        user_id: entry.user_id,
        metadata: entry.metadata,
        created_at: Utc::now(),
    };
    state.access_log.push(stored.clone());
    stored
}

#[async_trait]
impl AccessLogStore for InMemoryStore {
    async fn list_for_submission(
        &self,
        submission_id: Uuid,
    ) -> Result<Vec<AccessLogEntry>, AppError> {
        Ok(self
            .lock()
            .access_log
            .iter()
            .filter(|e| e.submission_id == submission_id)
            .cloned()
            .collect())
    }
}

/// Presigner that fabricates deterministic URLs and records every request.
pub struct RecordingPresigner {
    bucket: String,
    calls: AtomicU32,
    transient_failures: AtomicU32,
    broken: AtomicBool,
    uploads: Mutex<Vec<UploadPresignRequest>>,
    downloads: Mutex<Vec<(String, String, Duration)>>,
}

impl RecordingPresigner {
    pub fn new(bucket: &str) -> Arc<Self> {
        Arc::new(Self {
            bucket: bucket.to_string(),
            calls: AtomicU32::new(0),
            transient_failures: AtomicU32::new(0),
            broken: AtomicBool::new(false),
            uploads: Mutex::new(Vec::new()),
            downloads: Mutex::new(Vec::new()),
        })
    }

    /// Fail the next `n` calls with a transient error.
    pub fn fail_next(&self, n: u32) {
        self.transient_failures.store(n, Ordering::SeqCst);
    }

    /// Fail every call with a permanent error.
    pub fn set_broken(&self, broken: bool) {
        self.broken.store(broken, Ordering::SeqCst);
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn uploads(&self) -> Vec<UploadPresignRequest> {
        self.uploads
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn downloads(&self) -> Vec<(String, String, Duration)> {
        self.downloads
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn attempt(&self) -> StorageResult<u32> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.broken.load(Ordering::SeqCst) {
            return Err(StorageError::ConfigError("credentials rejected".to_string()));
        }
        let pending = self.transient_failures.load(Ordering::SeqCst);
        if pending > 0 {
            self.transient_failures.store(pending - 1, Ordering::SeqCst);
            return Err(StorageError::PresignFailed("connection timed out".to_string()));
        }
        Ok(n)
    }
}

#[async_trait]
impl Presigner for RecordingPresigner {
    async fn presign_upload(&self, request: &UploadPresignRequest) -> StorageResult<String> {
        let n = self.attempt()?;
        self.uploads
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(request.clone());
        Ok(format!(
            "https://{}.storage.test/{}?X-Amz-Expires={}&X-Amz-Signature=put{}",
            self.bucket,
            request.key,
            request.expires_in.as_secs(),
            n
        ))
    }

    async fn presign_download(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
    ) -> StorageResult<String> {
        let n = self.attempt()?;
        self.downloads
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push((bucket.to_string(), key.to_string(), expires_in));
        Ok(format!(
            "https://{}.storage.test/{}?X-Amz-Expires={}&X-Amz-Signature=get{}",
            bucket,
            key,
            expires_in.as_secs(),
            n
        ))
    }

    fn bucket(&self) -> &str {
        &self.bucket
    }
}
