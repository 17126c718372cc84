//! Test helpers: the real router over in-memory stores, a recording presigner
//! and a pinned clock.
//!
//! Run from workspace root: `cargo test -p bidvault-api`. No database or
//! object storage is needed.

#![allow(dead_code)]

pub mod auth;
pub mod fixtures;

use axum_test::TestServer;
use bidvault_api::setup::routes;
use bidvault_api::AppState;
use bidvault_core::{BaseConfig, Config, FixedClock, GateConfig, StorageConfig};
use bidvault_services::testing::{InMemoryStore, RecordingPresigner};
use bidvault_services::{GateServices, RetryPolicy};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;

pub const TEST_BUCKET: &str = "oc-bids";
pub const TEST_EVENT_SECRET: &str = "test-storage-event-secret-at-least-32-chars";

/// Test application: server plus handles on the fakes behind it.
pub struct TestApp {
    pub server: TestServer,
    pub store: Arc<InMemoryStore>,
    pub presigner: Arc<RecordingPresigner>,
    pub clock: Arc<FixedClock>,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }

    pub fn set_time(&self, now: DateTime<Utc>) {
        self.clock.set(now);
    }
}

pub fn test_config(storage_event_secret: Option<&str>) -> Config {
    Config {
        base: BaseConfig {
            server_port: 0,
            cors_origins: vec!["*".to_string()],
            db_max_connections: 1,
            db_timeout_seconds: 1,
            jwt_secret: auth::TEST_JWT_SECRET.to_string(),
            environment: "test".to_string(),
            trusted_proxy_count: 1,
        },
        database_url: "postgres://localhost/bidvault_test".to_string(),
        storage: StorageConfig {
            bucket: TEST_BUCKET.to_string(),
            region: "us-east-1".to_string(),
            endpoint: None,
        },
        gate: GateConfig {
            storage_event_secret: storage_event_secret.map(String::from),
            ..GateConfig::default()
        },
    }
}

/// App with the storage event webhook enabled, clock two hours before the deadline.
pub fn setup_test_app() -> TestApp {
    setup_test_app_with(fixtures::before_deadline(), Some(TEST_EVENT_SECRET))
}

pub fn setup_test_app_at(now: DateTime<Utc>) -> TestApp {
    setup_test_app_with(now, Some(TEST_EVENT_SECRET))
}

pub fn setup_test_app_with(now: DateTime<Utc>, storage_event_secret: Option<&str>) -> TestApp {
    let config = test_config(storage_event_secret);
    let store = InMemoryStore::new();
    let presigner = RecordingPresigner::new(TEST_BUCKET);
    let clock = Arc::new(FixedClock::new(now));

    let services = GateServices::with_retry(
        store.stores(),
        presigner.clone(),
        clock.clone(),
        &config.gate,
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::ZERO,
        },
    );
    let state = Arc::new(AppState::new(config.clone(), None, services));
    let router = routes::setup_routes(&config, state).expect("Failed to build router");
    let server = TestServer::new(router).expect("Failed to start test server");

    TestApp {
        server,
        store,
        presigner,
        clock,
    }
}
