use async_trait::async_trait;
use bidvault_core::models::{Rfp, VendorSubmission};
use bidvault_core::store::{RfpStore, RoleStore, VendorSubmissionStore};
use bidvault_core::{AppError, RoleSet};
use sqlx::PgPool;
use uuid::Uuid;

/// Repository for RFP records (read-only here)
#[derive(Clone)]
pub struct RfpRepository {
    pool: PgPool,
}

impl RfpRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RfpStore for RfpRepository {
    #[tracing::instrument(skip(self))]
    async fn get_rfp(&self, rfp_id: Uuid) -> Result<Option<Rfp>, AppError> {
        let rfp = sqlx::query_as::<_, Rfp>(
            r#"
            SELECT id, proposal_due, status
            FROM rfp
            WHERE id = $1
            "#,
        )
        .bind(rfp_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(rfp)
    }
}

/// Repository for role grants from the identity provider
#[derive(Clone)]
pub struct UserRoleRepository {
    pool: PgPool,
}

impl UserRoleRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RoleStore for UserRoleRepository {
    #[tracing::instrument(skip(self))]
    async fn roles_for(&self, user_id: Uuid) -> Result<RoleSet, AppError> {
        let names: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT role
            FROM user_roles
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(RoleSet::from_names(names))
    }
}

/// Repository for vendor registrations against an RFP
#[derive(Clone)]
pub struct VendorSubmissionRepository {
    pool: PgPool,
}

impl VendorSubmissionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl VendorSubmissionStore for VendorSubmissionRepository {
    #[tracing::instrument(skip(self))]
    async fn find_vendor_submission(
        &self,
        rfp_id: Uuid,
        vendor_id: Uuid,
    ) -> Result<Option<VendorSubmission>, AppError> {
        let record = sqlx::query_as::<_, VendorSubmission>(
            r#"
            SELECT id, rfp_id, vendor_id, vendor_name
            FROM vendor_submission
            WHERE rfp_id = $1 AND vendor_id = $2
            LIMIT 1
            "#,
        )
        .bind(rfp_id)
        .bind(vendor_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }
}
