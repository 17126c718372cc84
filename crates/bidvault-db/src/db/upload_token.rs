use super::decode_submission_type;
use async_trait::async_trait;
use bidvault_core::models::{NewUploadToken, SubmissionType, UploadToken};
use bidvault_core::store::UploadTokenStore;
use bidvault_core::AppError;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

const TOKEN_COLUMNS: &str = r#"
    id, rfp_id, vendor_id, submission_type, s3_key, presigned_url, expires_at,
    used, created_by, ip_address, user_agent, created_at, used_at
"#;

/// Repository for presigned upload tokens
#[derive(Clone)]
pub struct UploadTokenRepository {
    pool: PgPool,
}

impl UploadTokenRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn token_from_row(row: &PgRow) -> Result<UploadToken, sqlx::Error> {
    Ok(UploadToken {
        id: row.try_get("id")?,
        rfp_id: row.try_get("rfp_id")?,
        vendor_id: row.try_get("vendor_id")?,
        submission_type: decode_submission_type(row.try_get("submission_type")?)?,
        storage_key: row.try_get("s3_key")?,
        presigned_url: row.try_get("presigned_url")?,
        expires_at: row.try_get("expires_at")?,
        used: row.try_get("used")?,
        created_by: row.try_get("created_by")?,
        ip_address: row.try_get("ip_address")?,
        user_agent: row.try_get("user_agent")?,
        created_at: row.try_get("created_at")?,
        used_at: row.try_get("used_at")?,
    })
}

fn persist_error(err: sqlx::Error) -> AppError {
    tracing::error!(error = %err, "Failed to persist upload token");
    AppError::TokenPersist(err.to_string())
}

#[async_trait]
impl UploadTokenStore for UploadTokenRepository {
    #[tracing::instrument(skip(self))]
    async fn find_active(
        &self,
        rfp_id: Uuid,
        vendor_id: Uuid,
        submission_type: SubmissionType,
        now: DateTime<Utc>,
    ) -> Result<Option<UploadToken>, AppError> {
        let row = sqlx::query(&format!(
            r#"
            SELECT {TOKEN_COLUMNS}
            FROM presigned_upload_tokens
            WHERE rfp_id = $1
              AND vendor_id = $2
              AND submission_type = $3
              AND used = FALSE
              AND expires_at > $4
            LIMIT 1
            "#
        ))
        .bind(rfp_id)
        .bind(vendor_id)
        .bind(submission_type.as_str())
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(token_from_row).transpose().map_err(Into::into)
    }

    #[tracing::instrument(skip(self, token), fields(rfp_id = %token.rfp_id, vendor_id = %token.vendor_id))]
    async fn insert_or_adopt(
        &self,
        token: NewUploadToken,
        now: DateTime<Utc>,
    ) -> Result<UploadToken, AppError> {
        // Replaces an expired unused row in place; a live one makes the upsert a no-op.
        let inserted = sqlx::query(&format!(
            r#"
            INSERT INTO presigned_upload_tokens (
                id, rfp_id, vendor_id, submission_type, s3_key, presigned_url,
                expires_at, used, created_by, ip_address, user_agent, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, FALSE, $8, $9, $10, $11)
            ON CONFLICT (rfp_id, vendor_id, submission_type) WHERE used = FALSE
            DO UPDATE SET
                id = EXCLUDED.id,
                s3_key = EXCLUDED.s3_key,
                presigned_url = EXCLUDED.presigned_url,
                expires_at = EXCLUDED.expires_at,
                created_by = EXCLUDED.created_by,
                ip_address = EXCLUDED.ip_address,
                user_agent = EXCLUDED.user_agent,
                created_at = EXCLUDED.created_at
            WHERE presigned_upload_tokens.expires_at <= EXCLUDED.created_at
            RETURNING {TOKEN_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(token.rfp_id)
        .bind(token.vendor_id)
        .bind(token.submission_type.as_str())
        .bind(&token.storage_key)
        .bind(&token.presigned_url)
        .bind(token.expires_at)
        .bind(token.created_by)
        .bind(&token.ip_address)
        .bind(&token.user_agent)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(persist_error)?;

        if let Some(row) = inserted {
            return token_from_row(&row).map_err(persist_error);
        }

        tracing::debug!("Live upload token already stored for slot, adopting it");

        let adopted = self
            .find_active(token.rfp_id, token.vendor_id, token.submission_type, now)
            .await
            .map_err(|e| AppError::TokenPersist(e.to_string()))?;

        adopted.ok_or_else(|| {
            AppError::TokenPersist("upload slot changed during issuance".to_string())
        })
    }
}
