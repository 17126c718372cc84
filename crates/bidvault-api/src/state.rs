//! Application state shared by every handler.

use crate::auth::JwtService;
use bidvault_core::Config;
use bidvault_services::GateServices;
use sqlx::PgPool;

/// Bearer validation and webhook authentication settings.
#[derive(Clone)]
pub struct SecurityState {
    pub jwt: JwtService,
    /// `None` disables the storage event webhook
    pub storage_event_secret: Option<String>,
    pub trusted_proxy_count: usize,
}

impl SecurityState {
    pub fn from_config(config: &Config) -> Self {
        Self {
            jwt: JwtService::new(config.jwt_secret()),
            storage_event_secret: config.gate.storage_event_secret.clone(),
            trusted_proxy_count: config.trusted_proxy_count(),
        }
    }
}

pub struct AppState {
    pub config: Config,
    /// Absent when the services run on non-SQL stores
    pub pool: Option<PgPool>,
    pub services: GateServices,
    pub security: SecurityState,
}

impl AppState {
    pub fn new(config: Config, pool: Option<PgPool>, services: GateServices) -> Self {
        let security = SecurityState::from_config(&config);
        Self {
            config,
            pool,
            services,
            security,
        }
    }
}
