//! Repository tests against a real Postgres: the slot upsert, the first-open
//! compare-and-set and the seal upsert, each with its access-log write.
//!
//! Run with: `cargo test -p bidvault-db --test repositories_test`

mod helpers;

use bidvault_core::models::{AccessAction, DownloadAccess, SealedUpload, SubmissionType};
use bidvault_core::store::{AccessLogStore, SubmissionStore, UploadTokenStore};
use bidvault_core::AppError;
use bidvault_db::{AccessLogRepository, BidSubmissionRepository, UploadTokenRepository};
use chrono::{DateTime, Duration, Utc};
use helpers::{
    break_access_log, hours, insert_rfp, morning, new_token, proposal_due, register_vendor,
    restore_access_log, setup_test_db, storage_key,
};
use sqlx::PgPool;
use uuid::Uuid;

fn sealed_upload(
    rfp_id: Uuid,
    vendor_submission_id: Uuid,
    key: &str,
    etag: &str,
    sealed_at: DateTime<Utc>,
) -> SealedUpload {
    SealedUpload {
        rfp_id,
        vendor_submission_id,
        submission_type: SubmissionType::Technical,
        bucket: "oc-bids".to_string(),
        key: key.to_string(),
        etag: Some(etag.to_string()),
        file_name: "bid.pdf".to_string(),
        file_size: Some(4096),
        sealed_at,
        log_metadata: serde_json::json!({ "s3_etag": etag }),
    }
}

fn download(submission_id: Uuid, user_id: Uuid, at: DateTime<Utc>) -> DownloadAccess {
    DownloadAccess {
        submission_id,
        user_id,
        at,
        metadata: serde_json::json!({ "ip_address": "203.0.113.7" }),
    }
}

async fn count(pool: &PgPool, sql: &str) -> i64 {
    sqlx::query_scalar(sql)
        .fetch_one(pool)
        .await
        .expect("count query failed")
}

#[tokio::test]
async fn test_live_token_adopted_by_second_insert() {
    let db = setup_test_db().await;
    let tokens = UploadTokenRepository::new(db.pool.clone());
    let rfp_id = insert_rfp(&db.pool, "open").await;
    let vendor_id = Uuid::new_v4();
    let key = storage_key(rfp_id, vendor_id, "bid.pdf");

    let first = tokens
        .insert_or_adopt(
            new_token(rfp_id, vendor_id, &key, "https://put/first", morning() + hours(1)),
            morning(),
        )
        .await
        .unwrap();
    let second = tokens
        .insert_or_adopt(
            new_token(rfp_id, vendor_id, &key, "https://put/second", morning() + hours(1)),
            morning() + Duration::minutes(5),
        )
        .await
        .unwrap();

    assert_eq!(second.id, first.id);
    assert_eq!(second.presigned_url, "https://put/first");
    assert_eq!(
        count(&db.pool, "SELECT COUNT(*) FROM presigned_upload_tokens").await,
        1
    );

    let active = tokens
        .find_active(rfp_id, vendor_id, SubmissionType::Technical, morning())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(active.id, first.id);
    assert_eq!(active.ip_address.as_deref(), Some("198.51.100.4"));
}

#[tokio::test]
async fn test_expired_token_replaced_in_place() {
    let db = setup_test_db().await;
    let tokens = UploadTokenRepository::new(db.pool.clone());
    let rfp_id = insert_rfp(&db.pool, "open").await;
    let vendor_id = Uuid::new_v4();

    let stale = tokens
        .insert_or_adopt(
            new_token(
                rfp_id,
                vendor_id,
                &storage_key(rfp_id, vendor_id, "old.pdf"),
                "https://put/old",
                morning() - hours(1),
            ),
            morning() - hours(2),
        )
        .await
        .unwrap();
    assert!(tokens
        .find_active(rfp_id, vendor_id, SubmissionType::Technical, morning())
        .await
        .unwrap()
        .is_none());

    let fresh_key = storage_key(rfp_id, vendor_id, "new.pdf");
    let fresh = tokens
        .insert_or_adopt(
            new_token(rfp_id, vendor_id, &fresh_key, "https://put/new", morning() + hours(1)),
            morning(),
        )
        .await
        .unwrap();

    assert_ne!(fresh.id, stale.id);
    assert_eq!(fresh.storage_key, fresh_key);
    assert_eq!(fresh.presigned_url, "https://put/new");
    assert_eq!(
        count(
            &db.pool,
            "SELECT COUNT(*) FROM presigned_upload_tokens WHERE used = FALSE"
        )
        .await,
        1
    );
}

#[tokio::test]
async fn test_seal_consumes_token_and_logs_once() {
    let db = setup_test_db().await;
    let tokens = UploadTokenRepository::new(db.pool.clone());
    let submissions = BidSubmissionRepository::new(db.pool.clone());
    let access_log = AccessLogRepository::new(db.pool.clone());
    let rfp_id = insert_rfp(&db.pool, "open").await;
    let vendor_id = Uuid::new_v4();
    let vendor_submission_id = register_vendor(&db.pool, rfp_id, vendor_id).await;
    let key = storage_key(rfp_id, vendor_id, "bid.pdf");
    tokens
        .insert_or_adopt(
            new_token(rfp_id, vendor_id, &key, "https://put/bid", morning() + hours(1)),
            morning(),
        )
        .await
        .unwrap();

    let sealed_at = morning() + Duration::minutes(20);
    let outcome = submissions
        .record_sealed(sealed_upload(rfp_id, vendor_submission_id, &key, "etag-1", sealed_at))
        .await
        .unwrap();
    assert!(outcome.newly_sealed);
    assert_eq!(outcome.tokens_used, 1);
    assert!(outcome.submission.sealed);
    assert_eq!(outcome.submission.sealed_at, Some(sealed_at));

    let later = sealed_upload(rfp_id, vendor_submission_id, &key, "etag-2", sealed_at + hours(1));
    let again = submissions.record_sealed(later).await.unwrap();
    assert!(!again.newly_sealed);
    assert!(again.entry.is_none());
    assert_eq!(again.submission.id, outcome.submission.id);
    assert_eq!(again.submission.s3_etag.as_deref(), Some("etag-1"));
    assert_eq!(again.submission.sealed_at, Some(sealed_at));

    assert!(tokens
        .find_active(rfp_id, vendor_id, SubmissionType::Technical, morning())
        .await
        .unwrap()
        .is_none());
    let log = access_log
        .list_for_submission(outcome.submission.id)
        .await
        .unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].action, AccessAction::Sealed);
    assert_eq!(log[0].metadata["s3_etag"], "etag-1");
}

#[tokio::test]
async fn test_seal_rolled_back_when_log_write_fails() {
    let db = setup_test_db().await;
    let tokens = UploadTokenRepository::new(db.pool.clone());
    let submissions = BidSubmissionRepository::new(db.pool.clone());
    let rfp_id = insert_rfp(&db.pool, "open").await;
    let vendor_id = Uuid::new_v4();
    let vendor_submission_id = register_vendor(&db.pool, rfp_id, vendor_id).await;
    let key = storage_key(rfp_id, vendor_id, "bid.pdf");
    tokens
        .insert_or_adopt(
            new_token(rfp_id, vendor_id, &key, "https://put/bid", morning() + hours(1)),
            morning(),
        )
        .await
        .unwrap();

    break_access_log(&db.pool).await;
    let err = submissions
        .record_sealed(sealed_upload(rfp_id, vendor_submission_id, &key, "etag-1", morning()))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Database(_)));
    assert!(submissions.find_by_storage_key(&key).await.unwrap().is_none());
    assert_eq!(
        count(
            &db.pool,
            "SELECT COUNT(*) FROM presigned_upload_tokens WHERE used = TRUE"
        )
        .await,
        0
    );

    restore_access_log(&db.pool).await;
    let outcome = submissions
        .record_sealed(sealed_upload(rfp_id, vendor_submission_id, &key, "etag-1", morning()))
        .await
        .unwrap();
    assert!(outcome.newly_sealed);
    assert_eq!(outcome.tokens_used, 1);
}

#[tokio::test]
async fn test_first_download_opens_once() {
    let db = setup_test_db().await;
    let submissions = BidSubmissionRepository::new(db.pool.clone());
    let access_log = AccessLogRepository::new(db.pool.clone());
    let rfp_id = insert_rfp(&db.pool, "open").await;
    let vendor_id = Uuid::new_v4();
    let vendor_submission_id = register_vendor(&db.pool, rfp_id, vendor_id).await;
    let key = storage_key(rfp_id, vendor_id, "bid.pdf");
    let sealed = submissions
        .record_sealed(sealed_upload(rfp_id, vendor_submission_id, &key, "etag", morning()))
        .await
        .unwrap()
        .submission;

    let first_reader = Uuid::new_v4();
    let opened_at = proposal_due() + Duration::seconds(1);
    let first = submissions
        .record_download(download(sealed.id, first_reader, opened_at))
        .await
        .unwrap();
    assert_eq!(first.action, AccessAction::Opened);
    assert_eq!(first.submission.opened_at, Some(opened_at));
    assert_eq!(first.submission.opened_by, Some(first_reader));

    let second = submissions
        .record_download(download(sealed.id, Uuid::new_v4(), opened_at + hours(1)))
        .await
        .unwrap();
    assert_eq!(second.action, AccessAction::Accessed);
    assert_eq!(second.submission.opened_at, Some(opened_at));
    assert_eq!(second.submission.opened_by, Some(first_reader));

    let actions: Vec<AccessAction> = access_log
        .list_for_submission(sealed.id)
        .await
        .unwrap()
        .iter()
        .map(|e| e.action)
        .collect();
    assert_eq!(
        actions,
        vec![AccessAction::Sealed, AccessAction::Opened, AccessAction::Accessed]
    );
    assert!(first.entry.metadata.get("opened_at").is_some());
    assert_eq!(first.entry.metadata["ip_address"], "203.0.113.7");
}

#[tokio::test]
async fn test_open_rolled_back_when_log_write_fails() {
    let db = setup_test_db().await;
    let submissions = BidSubmissionRepository::new(db.pool.clone());
    let access_log = AccessLogRepository::new(db.pool.clone());
    let rfp_id = insert_rfp(&db.pool, "open").await;
    let vendor_id = Uuid::new_v4();
    let vendor_submission_id = register_vendor(&db.pool, rfp_id, vendor_id).await;
    let key = storage_key(rfp_id, vendor_id, "bid.pdf");
    let sealed = submissions
        .record_sealed(sealed_upload(rfp_id, vendor_submission_id, &key, "etag", morning()))
        .await
        .unwrap()
        .submission;
    let reader = Uuid::new_v4();
    let at = proposal_due() + hours(1);

    break_access_log(&db.pool).await;
    assert!(submissions
        .record_download(download(sealed.id, reader, at))
        .await
        .is_err());
    let current = submissions.get_submission(sealed.id).await.unwrap().unwrap();
    assert!(current.opened_at.is_none());

    restore_access_log(&db.pool).await;
    let retried = submissions
        .record_download(download(sealed.id, reader, at))
        .await
        .unwrap();
    assert_eq!(retried.action, AccessAction::Opened);
    let opened = access_log
        .list_for_submission(sealed.id)
        .await
        .unwrap()
        .into_iter()
        .filter(|e| e.action == AccessAction::Opened)
        .count();
    assert_eq!(opened, 1);
}

#[tokio::test]
async fn test_download_of_unknown_submission() {
    let db = setup_test_db().await;
    let submissions = BidSubmissionRepository::new(db.pool.clone());

    let err = submissions
        .record_download(download(Uuid::new_v4(), Uuid::new_v4(), proposal_due()))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}
