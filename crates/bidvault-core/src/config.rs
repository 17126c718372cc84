//! Configuration module
//!
//! Configuration is read from the environment (optionally seeded from `.env`)
//! and validated once at startup.

use std::env;

use crate::constants::{DEFAULT_BID_BUCKET, DOWNLOAD_URL_TTL_SECS, UPLOAD_URL_TTL_SECS};

// Common constants
const MAX_CONNECTIONS: u32 = 20;
const CONNECTION_TIMEOUT_SECS: u64 = 30;
const DEFAULT_REGION: &str = "us-east-1";
const TRUSTED_PROXY_COUNT: usize = 1;

/// HTTP server settings
#[derive(Clone, Debug)]
pub struct BaseConfig {
    pub server_port: u16,
    pub cors_origins: Vec<String>,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    pub jwt_secret: String,
    pub environment: String,
    pub trusted_proxy_count: usize,
}

/// Object storage settings
#[derive(Clone, Debug)]
pub struct StorageConfig {
    pub bucket: String,
    pub region: String,
    /// Custom endpoint for S3-compatible providers (MinIO, ...)
    pub endpoint: Option<String>,
}

/// Credential lifetimes and the sealing webhook secret
#[derive(Clone, Debug)]
pub struct GateConfig {
    pub upload_url_ttl_secs: u64,
    pub download_url_ttl_secs: u64,
    /// Shared secret the storage event feed authenticates with. `None` disables the webhook.
    pub storage_event_secret: Option<String>,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            upload_url_ttl_secs: UPLOAD_URL_TTL_SECS,
            download_url_ttl_secs: DOWNLOAD_URL_TTL_SECS,
            storage_event_secret: None,
        }
    }
}

/// Application configuration
#[derive(Clone, Debug)]
pub struct Config {
    pub base: BaseConfig,
    pub database_url: String,
    pub storage: StorageConfig,
    pub gate: GateConfig,
}

fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let cors_origins = env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let base = BaseConfig {
            server_port: env::var("PORT")
                .unwrap_or_else(|_| "4000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
            cors_origins,
            db_max_connections: parse_or("DB_MAX_CONNECTIONS", MAX_CONNECTIONS),
            db_timeout_seconds: parse_or("DB_TIMEOUT_SECONDS", CONNECTION_TIMEOUT_SECS),
            jwt_secret: env::var("JWT_SECRET")
                .map_err(|_| anyhow::anyhow!("JWT_SECRET must be set for authentication"))?,
            environment,
            trusted_proxy_count: parse_or("TRUSTED_PROXY_COUNT", TRUSTED_PROXY_COUNT),
        };

        let storage = StorageConfig {
            bucket: env::var("S3_BUCKET").unwrap_or_else(|_| DEFAULT_BID_BUCKET.to_string()),
            region: env::var("S3_REGION")
                .or_else(|_| env::var("AWS_REGION"))
                .unwrap_or_else(|_| DEFAULT_REGION.to_string()),
            endpoint: env::var("S3_ENDPOINT").ok().filter(|s| !s.is_empty()),
        };

        let gate = GateConfig {
            upload_url_ttl_secs: parse_or("UPLOAD_URL_TTL_SECS", UPLOAD_URL_TTL_SECS),
            download_url_ttl_secs: parse_or("DOWNLOAD_URL_TTL_SECS", DOWNLOAD_URL_TTL_SECS),
            storage_event_secret: env::var("STORAGE_EVENT_SECRET")
                .ok()
                .filter(|s| !s.is_empty()),
        };

        let config = Config {
            base,
            database_url: env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?,
            storage,
            gate,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.base.jwt_secret.len() < 32 {
            return Err(anyhow::anyhow!(
                "JWT_SECRET must be at least 32 characters long"
            ));
        }

        if !(self.database_url.starts_with("postgresql://")
            || self.database_url.starts_with("postgres://"))
        {
            return Err(anyhow::anyhow!(
                "DATABASE_URL must be a valid PostgreSQL connection string"
            ));
        }

        if self.is_production() && self.base.cors_origins.iter().any(|o| o == "*") {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }

        if self.storage.bucket.trim().is_empty() {
            return Err(anyhow::anyhow!("S3_BUCKET must not be empty"));
        }

        if self.gate.upload_url_ttl_secs == 0 || self.gate.download_url_ttl_secs == 0 {
            return Err(anyhow::anyhow!(
                "UPLOAD_URL_TTL_SECS and DOWNLOAD_URL_TTL_SECS must be positive"
            ));
        }

        // S3 caps presigned URL lifetime at 7 days
        const MAX_PRESIGN_SECS: u64 = 7 * 24 * 3600;
        if self.gate.upload_url_ttl_secs > MAX_PRESIGN_SECS
            || self.gate.download_url_ttl_secs > MAX_PRESIGN_SECS
        {
            return Err(anyhow::anyhow!(
                "Presigned URL lifetimes cannot exceed 7 days"
            ));
        }

        if let Some(secret) = &self.gate.storage_event_secret {
            if secret.len() < 32 {
                return Err(anyhow::anyhow!(
                    "STORAGE_EVENT_SECRET must be at least 32 characters long"
                ));
            }
        }

        Ok(())
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.base.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn server_port(&self) -> u16 {
        self.base.server_port
    }

    pub fn jwt_secret(&self) -> &str {
        &self.base.jwt_secret
    }

    pub fn cors_origins(&self) -> &[String] {
        &self.base.cors_origins
    }

    pub fn database_url(&self) -> &str {
        &self.database_url
    }

    pub fn db_max_connections(&self) -> u32 {
        self.base.db_max_connections
    }

    pub fn db_timeout_seconds(&self) -> u64 {
        self.base.db_timeout_seconds
    }

    pub fn environment(&self) -> &str {
        &self.base.environment
    }

    pub fn trusted_proxy_count(&self) -> usize {
        self.base.trusted_proxy_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> Config {
        Config {
            base: BaseConfig {
                server_port: 4000,
                cors_origins: vec!["https://app.example.com".to_string()],
                db_max_connections: 5,
                db_timeout_seconds: 5,
                jwt_secret: "x".repeat(32),
                environment: "development".to_string(),
                trusted_proxy_count: 1,
            },
            database_url: "postgres://localhost/bids".to_string(),
            storage: StorageConfig {
                bucket: "oc-bids".to_string(),
                region: "us-east-1".to_string(),
                endpoint: None,
            },
            gate: GateConfig::default(),
        }
    }

    #[test]
    fn test_valid_config() {
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn test_short_jwt_secret_rejected() {
        let mut config = valid();
        config.base.jwt_secret = "short".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_non_postgres_url_rejected() {
        let mut config = valid();
        config.database_url = "mysql://localhost/bids".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_wildcard_cors_rejected_in_production() {
        let mut config = valid();
        config.base.cors_origins = vec!["*".to_string()];
        assert!(config.validate().is_ok());
        config.base.environment = "production".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_default_gate_lifetimes() {
        let gate = GateConfig::default();
        assert_eq!(gate.upload_url_ttl_secs, 3600);
        assert_eq!(gate.download_url_ttl_secs, 3600);
    }

    #[test]
    fn test_short_storage_event_secret_rejected() {
        let mut config = valid();
        config.gate.storage_event_secret = Some("tiny".to_string());
        assert!(config.validate().is_err());
    }
}
