//! Wiring of repositories, presigner and services into the application state.

use crate::state::AppState;
use anyhow::{Context, Result};
use bidvault_core::{Config, SystemClock};
use bidvault_db::{
    AccessLogRepository, BidSubmissionRepository, RfpRepository, UploadTokenRepository,
    UserRoleRepository, VendorSubmissionRepository,
};
use bidvault_services::{GateServices, Stores};
use bidvault_storage::create_presigner;
use sqlx::PgPool;
use std::sync::Arc;

/// Stores backed by Postgres repositories.
pub fn postgres_stores(pool: &PgPool) -> Stores {
    Stores {
        rfps: Arc::new(RfpRepository::new(pool.clone())),
        roles: Arc::new(UserRoleRepository::new(pool.clone())),
        vendors: Arc::new(VendorSubmissionRepository::new(pool.clone())),
        tokens: Arc::new(UploadTokenRepository::new(pool.clone())),
        submissions: Arc::new(BidSubmissionRepository::new(pool.clone())),
        access_log: Arc::new(AccessLogRepository::new(pool.clone())),
    }
}

pub async fn initialize_services(config: &Config, pool: PgPool) -> Result<Arc<AppState>> {
    let presigner = create_presigner(&config.storage)
        .await
        .context("Failed to initialize object storage presigner")?;
    tracing::info!(
        bucket = %presigner.bucket(),
        region = %config.storage.region,
        custom_endpoint = config.storage.endpoint.is_some(),
        "Object storage presigner initialized"
    );

    if config.gate.storage_event_secret.is_none() {
        tracing::warn!(
            "STORAGE_EVENT_SECRET not set; storage event webhook disabled, uploads will not be sealed"
        );
    }

    let services = GateServices::new(
        postgres_stores(&pool),
        presigner,
        Arc::new(SystemClock),
        &config.gate,
    );

    Ok(Arc::new(AppState::new(config.clone(), Some(pool), services)))
}
