//! Submission Sealer
//!
//! Consumes object-storage `ObjectCreated` notifications. Each completed upload
//! under `rfp/` is locked into a sealed `bid_submissions` row, its upload token
//! is flipped to used, and a `sealed` access-log entry is appended, all in one
//! store write. A failed write leaves nothing behind, so the redelivered event
//! seals from scratch.
//!
//! Records that do not belong to this vault (other buckets, foreign keys,
//! unknown vendors) are skipped. A record for an already-sealed key is
//! acknowledged without touching the row, so redelivered events are harmless.

use crate::audit::log_access;
use bidvault_core::models::SealedUpload;
use bidvault_core::store::{SubmissionStore, VendorSubmissionStore};
use bidvault_core::{AppError, Clock};
use bidvault_storage::parse_storage_key;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

/// S3 event notification body
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct StorageEventNotification {
    #[serde(rename = "Records", default)]
    pub records: Vec<StorageEventRecord>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StorageEventRecord {
    #[serde(default)]
    pub event_source: String,
    #[serde(default)]
    pub event_name: String,
    pub s3: StorageEventEntity,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct StorageEventEntity {
    pub bucket: StorageEventBucket,
    pub object: StorageEventObject,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct StorageEventBucket {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct StorageEventObject {
    /// URL-encoded object key (`+` for spaces)
    pub key: String,
    #[serde(default)]
    pub size: Option<i64>,
    #[serde(rename = "eTag", default)]
    pub e_tag: Option<String>,
}

/// Summary returned to the event feed.
#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct SealReport {
    pub processed: usize,
    pub sealed: usize,
    pub skipped: usize,
    /// Submission ids sealed by this batch
    pub submission_ids: Vec<Uuid>,
}

enum RecordOutcome {
    Sealed(Uuid),
    Skipped(&'static str),
}

pub struct SubmissionSealer {
    vendors: Arc<dyn VendorSubmissionStore>,
    submissions: Arc<dyn SubmissionStore>,
    clock: Arc<dyn Clock>,
    bucket: String,
}

/// Decode an S3 event key: `+` is a space, the rest is percent-encoded.
pub fn decode_event_key(raw: &str) -> Option<String> {
    urlencoding::decode(&raw.replace('+', " "))
        .ok()
        .map(|key| key.into_owned())
}

impl SubmissionSealer {
    pub fn new(
        vendors: Arc<dyn VendorSubmissionStore>,
        submissions: Arc<dyn SubmissionStore>,
        clock: Arc<dyn Clock>,
        bucket: impl Into<String>,
    ) -> Self {
        Self {
            vendors,
            submissions,
            clock,
            bucket: bucket.into(),
        }
    }

    #[tracing::instrument(skip(self, notification), fields(records = notification.records.len(), operation = "seal_submissions"))]
    pub async fn process(
        &self,
        notification: StorageEventNotification,
    ) -> Result<SealReport, AppError> {
        let mut report = SealReport::default();

        for record in &notification.records {
            report.processed += 1;
            match self.seal_record(record).await? {
                RecordOutcome::Sealed(id) => {
                    report.sealed += 1;
                    report.submission_ids.push(id);
                }
                RecordOutcome::Skipped(reason) => {
                    tracing::debug!(
                        key = %record.s3.object.key,
                        event_name = %record.event_name,
                        reason = reason,
                        "Skipping storage event record"
                    );
                    report.skipped += 1;
                }
            }
        }

        Ok(report)
    }

    async fn seal_record(&self, record: &StorageEventRecord) -> Result<RecordOutcome, AppError> {
        if record.event_source != "aws:s3" || !record.event_name.starts_with("ObjectCreated") {
            return Ok(RecordOutcome::Skipped("not an object-created event"));
        }
        if record.s3.bucket.name != self.bucket {
            return Ok(RecordOutcome::Skipped("foreign bucket"));
        }

        let Some(key) = decode_event_key(&record.s3.object.key) else {
            return Ok(RecordOutcome::Skipped("undecodable key"));
        };
        let Ok(parsed) = parse_storage_key(&key) else {
            return Ok(RecordOutcome::Skipped("unexpected key format"));
        };

        if let Some(existing) = self.submissions.find_by_storage_key(&key).await? {
            if existing.sealed {
                return Ok(RecordOutcome::Skipped("already sealed"));
            }
        }

        let Some(vendor) = self
            .vendors
            .find_vendor_submission(parsed.rfp_id, parsed.vendor_id)
            .await?
        else {
            tracing::warn!(
                rfp_id = %parsed.rfp_id,
                vendor_id = %parsed.vendor_id,
                key = %key,
                "Upload completed without a vendor submission record"
            );
            return Ok(RecordOutcome::Skipped("no vendor submission record"));
        };

        let now = self.clock.now();
        let outcome = self
            .submissions
            .record_sealed(SealedUpload {
                rfp_id: parsed.rfp_id,
                vendor_submission_id: vendor.id,
                submission_type: parsed.submission_type,
                bucket: record.s3.bucket.name.clone(),
                key: key.clone(),
                etag: record.s3.object.e_tag.clone(),
                file_name: parsed.file_name.clone(),
                file_size: record.s3.object.size,
                sealed_at: now,
                log_metadata: serde_json::json!({
                    "s3_bucket": record.s3.bucket.name,
                    "s3_key": key,
                    "s3_etag": record.s3.object.e_tag,
                    "file_size": record.s3.object.size,
                    "event_name": record.event_name,
                    "processed_at": now,
                }),
            })
            .await?;

        // A concurrent delivery sealed it between the lookup and the write.
        if !outcome.newly_sealed {
            return Ok(RecordOutcome::Skipped("already sealed"));
        }
        if outcome.tokens_used == 0 {
            tracing::debug!(key = %key, "No unused upload token matched sealed object");
        }
        if let Some(entry) = &outcome.entry {
            log_access(entry);
        }
        let submission = outcome.submission;

        tracing::info!(
            submission_id = %submission.id,
            rfp_id = %parsed.rfp_id,
            submission_type = %parsed.submission_type,
            "Bid submission sealed"
        );

        Ok(RecordOutcome::Sealed(submission.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::InMemoryStore;
    use bidvault_core::models::{AccessAction, NewUploadToken, SubmissionType};
    use bidvault_core::store::UploadTokenStore;
    use bidvault_core::FixedClock;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 10, 15, 0, 0).unwrap()
    }

    fn sealer(store: &Arc<InMemoryStore>) -> SubmissionSealer {
        SubmissionSealer::new(
            store.clone(),
            store.clone(),
            Arc::new(FixedClock::new(now())),
            "oc-bids",
        )
    }

    fn event(bucket: &str, raw_key: &str) -> StorageEventNotification {
        serde_json::from_value(serde_json::json!({
            "Records": [{
                "eventSource": "aws:s3",
                "eventName": "ObjectCreated:Put",
                "s3": {
                    "bucket": { "name": bucket },
                    "object": { "key": raw_key, "size": 52311, "eTag": "9b2cf535f27731c974343645a3985328" }
                }
            }]
        }))
        .unwrap()
    }

    #[test]
    fn test_decode_event_key() {
        assert_eq!(
            decode_event_key("rfp/a/b/tech+bid%281%29.pdf").as_deref(),
            Some("rfp/a/b/tech bid(1).pdf")
        );
    }

    #[tokio::test]
    async fn test_seal_creates_submission_and_consumes_token() {
        let store = InMemoryStore::new();
        let rfp = store.insert_rfp(now() + Duration::days(1), "open");
        let vendor_id = Uuid::new_v4();
        let vendor = store.register_vendor(rfp.id, vendor_id);
        let key = format!("rfp/{}/2025-01-10/{}/commercial/price.pdf", rfp.id, vendor_id);
        store
            .insert_or_adopt(
                NewUploadToken {
                    rfp_id: rfp.id,
                    vendor_id,
                    submission_type: SubmissionType::Commercial,
                    storage_key: key.clone(),
                    presigned_url: "https://example.invalid/put".to_string(),
                    expires_at: now() + Duration::hours(1),
                    created_by: vendor_id,
                    ip_address: None,
                    user_agent: None,
                },
                now(),
            )
            .await
            .unwrap();

        let report = sealer(&store).process(event("oc-bids", &key)).await.unwrap();
        assert_eq!(report.processed, 1);
        assert_eq!(report.sealed, 1);

        let submission = store.submission(report.submission_ids[0]).unwrap();
        assert!(submission.sealed);
        assert_eq!(submission.sealed_at, Some(now()));
        assert_eq!(submission.vendor_submission_id, vendor.id);
        assert_eq!(submission.submission_type, SubmissionType::Commercial);
        assert_eq!(submission.file_name, "price.pdf");
        assert_eq!(submission.file_size, Some(52311));
        assert!(submission.opened_at.is_none());

        let tokens = store.tokens();
        assert!(tokens[0].used);
        assert_eq!(tokens[0].used_at, Some(now()));

        let log = store.access_log();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].action, AccessAction::Sealed);
        assert!(log[0].user_id.is_none());
    }

    #[tokio::test]
    async fn test_redelivered_event_is_skipped() {
        let store = InMemoryStore::new();
        let rfp = store.insert_rfp(now() + Duration::days(1), "open");
        let vendor_id = Uuid::new_v4();
        store.register_vendor(rfp.id, vendor_id);
        let key = format!("rfp/{}/2025-01-10/{}/technical/bid.pdf", rfp.id, vendor_id);

        let sealer = sealer(&store);
        sealer.process(event("oc-bids", &key)).await.unwrap();
        let again = sealer.process(event("oc-bids", &key)).await.unwrap();

        assert_eq!(again.sealed, 0);
        assert_eq!(again.skipped, 1);
        assert_eq!(store.access_log().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_seal_completes_on_redelivery() {
        let store = InMemoryStore::new();
        let rfp = store.insert_rfp(now() + Duration::days(1), "open");
        let vendor_id = Uuid::new_v4();
        store.register_vendor(rfp.id, vendor_id);
        let key = format!("rfp/{}/2025-01-10/{}/technical/bid.pdf", rfp.id, vendor_id);
        store
            .insert_or_adopt(
                NewUploadToken {
                    rfp_id: rfp.id,
                    vendor_id,
                    submission_type: SubmissionType::Technical,
                    storage_key: key.clone(),
                    presigned_url: "https://example.invalid/put".to_string(),
                    expires_at: now() + Duration::hours(1),
                    created_by: vendor_id,
                    ip_address: None,
                    user_agent: None,
                },
                now(),
            )
            .await
            .unwrap();
        let sealer = sealer(&store);

        store.fail_access_log(true);
        assert!(sealer.process(event("oc-bids", &key)).await.is_err());
        assert!(store.find_by_storage_key(&key).await.unwrap().is_none());
        assert!(!store.tokens()[0].used);
        assert!(store.access_log().is_empty());

        store.fail_access_log(false);
        let report = sealer.process(event("oc-bids", &key)).await.unwrap();
        assert_eq!(report.sealed, 1);
        assert!(store.tokens()[0].used);
        let log = store.access_log();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].action, AccessAction::Sealed);
        assert_eq!(log[0].submission_id, report.submission_ids[0]);
    }

    #[tokio::test]
    async fn test_foreign_records_skipped() {
        let store = InMemoryStore::new();
        let rfp = store.insert_rfp(now() + Duration::days(1), "open");
        let vendor_id = Uuid::new_v4();
        let key = format!("rfp/{}/2025-01-10/{}/technical/bid.pdf", rfp.id, vendor_id);
        let sealer = sealer(&store);

        // no vendor record
        assert_eq!(sealer.process(event("oc-bids", &key)).await.unwrap().skipped, 1);
        // other bucket
        store.register_vendor(rfp.id, vendor_id);
        assert_eq!(sealer.process(event("other", &key)).await.unwrap().skipped, 1);
        // not a bid key
        assert_eq!(
            sealer
                .process(event("oc-bids", "media/photo.png"))
                .await
                .unwrap()
                .skipped,
            1
        );
        assert!(store.access_log().is_empty());
    }

    #[tokio::test]
    async fn test_non_create_events_skipped() {
        let store = InMemoryStore::new();
        let notification: StorageEventNotification = serde_json::from_value(serde_json::json!({
            "Records": [{
                "eventSource": "aws:s3",
                "eventName": "ObjectRemoved:Delete",
                "s3": { "bucket": { "name": "oc-bids" }, "object": { "key": "rfp/x" } }
            }]
        }))
        .unwrap();

        let report = sealer(&store).process(notification).await.unwrap();
        assert_eq!(report.processed, 1);
        assert_eq!(report.skipped, 1);
    }
}
