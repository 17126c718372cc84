use async_trait::async_trait;
use bidvault_core::models::{AccessAction, AccessLogEntry, NewAccessLogEntry};
use bidvault_core::store::AccessLogStore;
use bidvault_core::AppError;
use sqlx::postgres::PgRow;
use sqlx::{PgConnection, PgPool, Row};
use uuid::Uuid;

/// Repository for the append-only submission access log
#[derive(Clone)]
pub struct AccessLogRepository {
    pool: PgPool,
}

impl AccessLogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn entry_from_row(row: &PgRow) -> Result<AccessLogEntry, sqlx::Error> {
    let action: String = row.try_get("action")?;
    Ok(AccessLogEntry {
        id: row.try_get("id")?,
        submission_id: row.try_get("submission_id")?,
        action: AccessAction::parse(&action)
            .ok_or_else(|| sqlx::Error::Decode(format!("unknown action '{}'", action).into()))?,
        user_id: row.try_get("user_id")?,
        metadata: row.try_get("metadata")?,
        created_at: row.try_get("created_at")?,
    })
}

/// Append one row on the caller's connection, so it commits or rolls back
/// with the state change it records.
pub(crate) async fn insert_entry(
    conn: &mut PgConnection,
    entry: &NewAccessLogEntry,
) -> Result<AccessLogEntry, sqlx::Error> {
    let row = sqlx::query(
        r#"
        INSERT INTO bid_submission_access_log (id, submission_id, action, user_id, metadata)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, submission_id, action, user_id, metadata, created_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(entry.submission_id)
    .bind(entry.action.as_str())
    .bind(entry.user_id)
    .bind(&entry.metadata)
    .fetch_one(conn)
    .await?;

    entry_from_row(&row)
}

#[async_trait]
impl AccessLogStore for AccessLogRepository {
    #[tracing::instrument(skip(self))]
    async fn list_for_submission(
        &self,
        submission_id: Uuid,
    ) -> Result<Vec<AccessLogEntry>, AppError> {
        let rows = sqlx::query(
            r#"
            SELECT id, submission_id, action, user_id, metadata, created_at
            FROM bid_submission_access_log
            WHERE submission_id = $1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(submission_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(entry_from_row)
            .collect::<Result<Vec<_>, _>>()?)
    }
}
