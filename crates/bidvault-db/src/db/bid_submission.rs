use super::access_log::insert_entry;
use super::decode_submission_type;
use async_trait::async_trait;
use bidvault_core::models::{
    AccessAction, BidSubmission, DownloadAccess, NewAccessLogEntry, RecordedDownload,
    SealOutcome, SealedUpload, SubmissionType,
};
use bidvault_core::store::SubmissionStore;
use bidvault_core::AppError;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

const SUBMISSION_COLUMNS: &str = r#"
    id, rfp_id, vendor_submission_id, submission_type, s3_bucket, s3_key, s3_etag,
    file_name, file_size, sealed, sealed_at, upload_completed_at, opened_at, opened_by,
    created_at
"#;

/// Repository for bid submission files
#[derive(Clone)]
pub struct BidSubmissionRepository {
    pool: PgPool,
}

impl BidSubmissionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn submission_from_row(row: &PgRow) -> Result<BidSubmission, sqlx::Error> {
    Ok(BidSubmission {
        id: row.try_get("id")?,
        rfp_id: row.try_get("rfp_id")?,
        vendor_submission_id: row.try_get("vendor_submission_id")?,
        submission_type: decode_submission_type(row.try_get("submission_type")?)?,
        s3_bucket: row.try_get("s3_bucket")?,
        s3_key: row.try_get("s3_key")?,
        s3_etag: row.try_get("s3_etag")?,
        file_name: row.try_get("file_name")?,
        file_size: row.try_get("file_size")?,
        sealed: row.try_get("sealed")?,
        sealed_at: row.try_get("sealed_at")?,
        upload_completed_at: row.try_get("upload_completed_at")?,
        opened_at: row.try_get("opened_at")?,
        opened_by: row.try_get("opened_by")?,
        created_at: row.try_get("created_at")?,
    })
}

#[async_trait]
impl SubmissionStore for BidSubmissionRepository {
    #[tracing::instrument(skip(self))]
    async fn get_submission(
        &self,
        submission_id: Uuid,
    ) -> Result<Option<BidSubmission>, AppError> {
        let row = sqlx::query(&format!(
            "SELECT {SUBMISSION_COLUMNS} FROM bid_submissions WHERE id = $1"
        ))
        .bind(submission_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(submission_from_row).transpose()?)
    }

    #[tracing::instrument(skip(self))]
    async fn find_by_storage_key(&self, key: &str) -> Result<Option<BidSubmission>, AppError> {
        let row = sqlx::query(&format!(
            "SELECT {SUBMISSION_COLUMNS} FROM bid_submissions WHERE s3_key = $1"
        ))
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(submission_from_row).transpose()?)
    }

    #[tracing::instrument(skip(self))]
    async fn find_for_vendor(
        &self,
        vendor_submission_id: Uuid,
        submission_type: SubmissionType,
    ) -> Result<Option<BidSubmission>, AppError> {
        let row = sqlx::query(&format!(
            r#"
            SELECT {SUBMISSION_COLUMNS}
            FROM bid_submissions
            WHERE vendor_submission_id = $1 AND submission_type = $2
            ORDER BY created_at DESC
            LIMIT 1
            "#
        ))
        .bind(vendor_submission_id)
        .bind(submission_type.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(submission_from_row).transpose()?)
    }

    #[tracing::instrument(skip(self))]
    async fn list_for_rfp(&self, rfp_id: Uuid) -> Result<Vec<BidSubmission>, AppError> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {SUBMISSION_COLUMNS}
            FROM bid_submissions
            WHERE rfp_id = $1
            ORDER BY created_at DESC
            "#
        ))
        .bind(rfp_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(submission_from_row)
            .collect::<Result<Vec<_>, _>>()?)
    }

    #[tracing::instrument(skip(self, upload), fields(s3_key = %upload.key))]
    async fn record_sealed(&self, upload: SealedUpload) -> Result<SealOutcome, AppError> {
        let mut tx = self.pool.begin().await?;

        // Sealed rows are never rewritten: the conflict update only touches unsealed ones.
        let sealed = sqlx::query(&format!(
            r#"
            INSERT INTO bid_submissions (
                id, rfp_id, vendor_submission_id, submission_type, s3_bucket, s3_key,
                s3_etag, file_name, file_size, sealed, sealed_at, upload_completed_at,
                created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, TRUE, $10, $10, $10)
            ON CONFLICT (s3_key) DO UPDATE SET
                s3_etag = EXCLUDED.s3_etag,
                file_size = EXCLUDED.file_size,
                sealed = TRUE,
                sealed_at = EXCLUDED.sealed_at,
                upload_completed_at = EXCLUDED.upload_completed_at
            WHERE bid_submissions.sealed = FALSE
            RETURNING {SUBMISSION_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(upload.rfp_id)
        .bind(upload.vendor_submission_id)
        .bind(upload.submission_type.as_str())
        .bind(&upload.bucket)
        .bind(&upload.key)
        .bind(&upload.etag)
        .bind(&upload.file_name)
        .bind(upload.file_size)
        .bind(upload.sealed_at)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = sealed else {
            tx.rollback().await?;
            let existing = self.find_by_storage_key(&upload.key).await?.ok_or_else(|| {
                AppError::Internal(format!("submission for key {} vanished", upload.key))
            })?;
            return Ok(SealOutcome {
                submission: existing,
                newly_sealed: false,
                tokens_used: 0,
                entry: None,
            });
        };
        let submission = submission_from_row(&row)?;

        let tokens_used = sqlx::query(
            r#"
            UPDATE presigned_upload_tokens
            SET used = TRUE, used_at = $2
            WHERE s3_key = $1 AND used = FALSE
            "#,
        )
        .bind(&upload.key)
        .bind(upload.sealed_at)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        let entry = insert_entry(
            &mut *tx,
            &NewAccessLogEntry {
                submission_id: submission.id,
                action: AccessAction::Sealed,
                user_id: None,
                metadata: upload.log_metadata,
            },
        )
        .await?;

        tx.commit().await.map_err(|e| {
            tracing::error!(error = %e, submission_id = %submission.id, "Failed to commit seal");
            AppError::from(e)
        })?;

        Ok(SealOutcome {
            submission,
            newly_sealed: true,
            tokens_used,
            entry: Some(entry),
        })
    }

    #[tracing::instrument(skip(self, access), fields(submission_id = %access.submission_id))]
    async fn record_download(
        &self,
        access: DownloadAccess,
    ) -> Result<RecordedDownload, AppError> {
        let mut tx = self.pool.begin().await?;

        let opened = sqlx::query(&format!(
            r#"
            UPDATE bid_submissions
            SET opened_at = $3, opened_by = $2
            WHERE id = $1 AND sealed = TRUE AND opened_at IS NULL
            RETURNING {SUBMISSION_COLUMNS}
            "#
        ))
        .bind(access.submission_id)
        .bind(access.user_id)
        .bind(access.at)
        .fetch_optional(&mut *tx)
        .await?;

        let (action, submission) = match opened {
            Some(row) => (AccessAction::Opened, submission_from_row(&row)?),
            None => {
                let row = sqlx::query(&format!(
                    "SELECT {SUBMISSION_COLUMNS} FROM bid_submissions WHERE id = $1"
                ))
                .bind(access.submission_id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| AppError::NotFound("Bid submission not found".to_string()))?;
                let current = submission_from_row(&row)?;
                if !current.sealed {
                    return Err(AppError::NotSealed);
                }
                (AccessAction::Accessed, current)
            }
        };

        let entry = insert_entry(&mut *tx, &access.entry_for(action)).await?;

        tx.commit().await.map_err(|e| {
            tracing::error!(error = %e, submission_id = %submission.id, "Failed to commit download");
            AppError::from(e)
        })?;

        Ok(RecordedDownload {
            action,
            submission,
            entry,
        })
    }
}
