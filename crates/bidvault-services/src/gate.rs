//! Download Gate
//!
//! Mints a read credential for a sealed submission, only for administrators and
//! only once the proposal deadline has passed. The first successful download
//! sets `opened_at`; every successful download appends one access-log entry in
//! the same store write. Any failure after the checks (minting, recording)
//! fails the request and leaves the submission as it was.

use crate::audit::{log_access, log_access_denied};
use crate::context::Caller;
use crate::retry::RetryPolicy;
use bidvault_core::deadline::remaining_ms;
use bidvault_core::models::{AccessAction, BidSubmission, DownloadAccess, Rfp};
use bidvault_core::store::{RfpStore, SubmissionStore};
use bidvault_core::{authorize, AppError, Capability, Clock};
use bidvault_storage::Presigner;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Outcome of a granted download.
#[derive(Debug, Clone)]
pub struct OpenedSubmission {
    pub download_url: String,
    pub expires_in: u64,
    /// Submission row as it stands after this request
    pub submission: BidSubmission,
    pub rfp: Rfp,
    pub action: AccessAction,
    pub accessed_at: DateTime<Utc>,
}

pub struct DownloadGate {
    rfps: Arc<dyn RfpStore>,
    submissions: Arc<dyn SubmissionStore>,
    presigner: Arc<dyn Presigner>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    retry: RetryPolicy,
}

impl DownloadGate {
    pub fn new(
        rfps: Arc<dyn RfpStore>,
        submissions: Arc<dyn SubmissionStore>,
        presigner: Arc<dyn Presigner>,
        clock: Arc<dyn Clock>,
        ttl: Duration,
    ) -> Self {
        Self {
            rfps,
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

    #[tracing::instrument(
        skip(self, caller),
        fields(user_id = %caller.user_id, operation = "open_submission")
    )]
    pub async fn open(
        &self,
        caller: &Caller,
        submission_id: Uuid,
    ) -> Result<OpenedSubmission, AppError> {
        let result = self.open_checked(caller, submission_id).await;
        if let Err(
            ref e @ (AppError::InsufficientPermissions(_)
            | AppError::DeadlineNotYetPassed { .. }
            | AppError::NotSealed),
        ) = result
        {
            log_access_denied("open_submission", caller.user_id, None, Some(submission_id), e);
        }
        result
    }

    async fn open_checked(
        &self,
        caller: &Caller,
        submission_id: Uuid,
    ) -> Result<OpenedSubmission, AppError> {
        authorize(&caller.roles, Capability::OpenSealedBid)?;

        let submission = self
            .submissions
            .get_submission(submission_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Bid submission not found".to_string()))?;

        let rfp = self
            .rfps
            .get_rfp(submission.rfp_id)
            .await?
            .ok_or_else(|| AppError::NotFound("RFP not found".to_string()))?;

        let now = self.clock.now();
        if !rfp.phase_at(now).downloads_allowed() {
            return Err(AppError::DeadlineNotYetPassed {
                proposal_due: rfp.proposal_due,
                current_time: now,
                remaining_ms: remaining_ms(rfp.proposal_due, now),
            });
        }

        if !submission.sealed {
            return Err(AppError::NotSealed);
        }

        let presigner = self.presigner.as_ref();
        let (bucket, key, ttl) = (&submission.s3_bucket, &submission.s3_key, self.ttl);
        let download_url = self
            .retry
            .run("presign_download", || presigner.presign_download(bucket, key, ttl))
            .await?;

        let recorded = self
            .submissions
            .record_download(DownloadAccess {
                submission_id: submission.id,
                user_id: caller.user_id,
                at: now,
                metadata: serde_json::json!({
                    "user_agent": caller.user_agent,
                    "ip_address": caller.ip_address,
                }),
            })
            .await?;
        log_access(&recorded.entry);
        let (action, submission) = (recorded.action, recorded.submission);

        tracing::info!(
            submission_id = %submission.id,
            rfp_id = %rfp.id,
            action = action.as_str(),
            "Bid submission download granted"
        );

        Ok(OpenedSubmission {
            download_url,
            expires_in: self.ttl.as_secs(),
            submission,
            rfp,
            action,
            accessed_at: now,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{InMemoryStore, RecordingPresigner};
    use bidvault_core::models::SubmissionType;
    use bidvault_core::{FixedClock, Role, RoleSet};
    use chrono::TimeZone;

    struct Fixture {
        store: Arc<InMemoryStore>,
        presigner: Arc<RecordingPresigner>,
        clock: Arc<FixedClock>,
        gate: DownloadGate,
    }

    fn due() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 10, 17, 0, 0).unwrap()
    }

    fn fixture(now: DateTime<Utc>) -> Fixture {
        let store = InMemoryStore::new();
        let presigner = RecordingPresigner::new("oc-bids");
        let clock = Arc::new(FixedClock::new(now));
        let gate = DownloadGate::new(
            store.clone(),
            store.clone(),
            presigner.clone(),
            clock.clone(),
            Duration::from_secs(3600),
        )
        .with_retry(RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::ZERO,
        });
        Fixture {
            store,
            presigner,
            clock,
            gate,
        }
    }

    fn admin() -> Caller {
        Caller::new(Uuid::new_v4(), RoleSet::empty().with(Role::Admin))
            .with_client(Some("203.0.113.7".to_string()), Some("test-agent".to_string()))
    }

    fn sealed_submission(store: &InMemoryStore, sealed: bool) -> BidSubmission {
        let rfp = store.insert_rfp(due(), "open");
        let vendor = store.register_vendor(rfp.id, Uuid::new_v4());
        let sealed_at = sealed.then(|| Utc.with_ymd_and_hms(2025, 1, 9, 10, 0, 0).unwrap());
        store.insert_submission(&vendor, SubmissionType::Technical, sealed_at)
    }

    #[tokio::test]
    async fn test_before_deadline_refused_with_remaining_time() {
        let f = fixture(Utc.with_ymd_and_hms(2025, 1, 10, 16, 59, 0).unwrap());
        let submission = sealed_submission(&f.store, true);

        let err = f.gate.open(&admin(), submission.id).await.unwrap_err();
        match err {
            AppError::DeadlineNotYetPassed { remaining_ms, .. } => assert_eq!(remaining_ms, 60_000),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(f.presigner.calls(), 0);
        assert!(f.store.access_log().is_empty());
    }

    #[tokio::test]
    async fn test_at_deadline_instant_refused() {
        let f = fixture(due());
        let submission = sealed_submission(&f.store, true);

        let err = f.gate.open(&admin(), submission.id).await.unwrap_err();
        assert!(matches!(err, AppError::DeadlineNotYetPassed { remaining_ms: 0, .. }));
    }

    #[tokio::test]
    async fn test_first_open_then_access() {
        let opened_at = Utc.with_ymd_and_hms(2025, 1, 10, 17, 0, 1).unwrap();
        let f = fixture(opened_at);
        let submission = sealed_submission(&f.store, true);
        let caller = admin();

        let first = f.gate.open(&caller, submission.id).await.unwrap();
        assert_eq!(first.action, AccessAction::Opened);
        assert_eq!(first.expires_in, 3600);
        assert_eq!(first.submission.opened_at, Some(opened_at));
        assert_eq!(
            f.store.submission(submission.id).unwrap().opened_by,
            Some(caller.user_id)
        );

        let later = Utc.with_ymd_and_hms(2025, 1, 10, 17, 5, 0).unwrap();
        f.clock.set(later);
        let second = f.gate.open(&caller, submission.id).await.unwrap();
        assert_eq!(second.action, AccessAction::Accessed);
        assert_eq!(second.submission.opened_at, Some(opened_at));
        assert_eq!(
            f.store.submission(submission.id).unwrap().opened_at,
            Some(opened_at)
        );

        let log = f.store.access_log();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].action, AccessAction::Opened);
        assert_eq!(log[0].metadata["ip_address"], "203.0.113.7");
        assert!(log[0].metadata.get("opened_at").is_some());
        assert_eq!(log[1].action, AccessAction::Accessed);
        assert!(log[1].metadata.get("accessed_at").is_some());

        let downloads = f.presigner.downloads();
        assert_eq!(downloads.len(), 2);
        assert_eq!(downloads[0].1, submission.s3_key);
        assert_eq!(downloads[0].2, Duration::from_secs(3600));
    }

    #[tokio::test]
    async fn test_unsealed_refused() {
        let f = fixture(Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap());
        let submission = sealed_submission(&f.store, false);

        let err = f.gate.open(&admin(), submission.id).await.unwrap_err();
        assert!(matches!(err, AppError::NotSealed));
        assert!(f.store.access_log().is_empty());
    }

    #[tokio::test]
    async fn test_vendor_refused_before_lookup() {
        let f = fixture(Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap());
        let vendor = Caller::new(Uuid::new_v4(), RoleSet::empty().with(Role::Vendor));

        let err = f.gate.open(&vendor, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, AppError::InsufficientPermissions(_)));
    }

    #[tokio::test]
    async fn test_unknown_submission() {
        let f = fixture(Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap());
        let err = f.gate.open(&admin(), Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_mint_failure_fails_closed() {
        let f = fixture(Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap());
        let submission = sealed_submission(&f.store, true);
        f.presigner.set_broken(true);

        let err = f.gate.open(&admin(), submission.id).await.unwrap_err();
        assert!(matches!(err, AppError::CredentialMint(_)));
        assert!(f.store.submission(submission.id).unwrap().opened_at.is_none());
        assert!(f.store.access_log().is_empty());
    }

    #[tokio::test]
    async fn test_log_failure_returns_no_url() {
        let f = fixture(Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap());
        let submission = sealed_submission(&f.store, true);
        f.store.fail_access_log(true);

        assert!(f.gate.open(&admin(), submission.id).await.is_err());
    }

    #[tokio::test]
    async fn test_first_open_survives_log_failure_and_retry() {
        let f = fixture(Utc.with_ymd_and_hms(2025, 1, 10, 17, 0, 1).unwrap());
        let submission = sealed_submission(&f.store, true);
        let caller = admin();

        f.store.fail_access_log(true);
        assert!(f.gate.open(&caller, submission.id).await.is_err());
        let untouched = f.store.submission(submission.id).unwrap();
        assert!(untouched.opened_at.is_none());
        assert!(untouched.opened_by.is_none());

        f.store.fail_access_log(false);
        let retried_at = Utc.with_ymd_and_hms(2025, 1, 10, 17, 0, 30).unwrap();
        f.clock.set(retried_at);
        let retried = f.gate.open(&caller, submission.id).await.unwrap();
        assert_eq!(retried.action, AccessAction::Opened);
        assert_eq!(retried.submission.opened_at, Some(retried_at));

        let actions: Vec<AccessAction> = f.store.access_log().iter().map(|e| e.action).collect();
        assert_eq!(actions, vec![AccessAction::Opened]);
    }
}
