use super::TestApp;
use bidvault_api::auth::JwtClaims;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use uuid::Uuid;

/// Must match `test_config`.
pub const TEST_JWT_SECRET: &str = "test-jwt-secret-at-least-32-characters-long";

/// Authenticated test user.
pub struct TestUser {
    pub user_id: Uuid,
    pub token: String,
}

impl TestUser {
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

pub fn token_for(user_id: Uuid, ttl_secs: i64) -> String {
    let now = chrono::Utc::now().timestamp();
    let claims = JwtClaims {
        sub: user_id,
        exp: now + ttl_secs,
        iat: Some(now),
        email: None,
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes()),
    )
    .expect("Failed to sign test token")
}

/// User with a valid token and no RFP role.
pub fn anonymous_user() -> TestUser {
    let user_id = Uuid::new_v4();
    TestUser {
        user_id,
        token: token_for(user_id, 3600),
    }
}

/// Vendor registered on `rfp_id`.
pub fn vendor_on(app: &TestApp, rfp_id: Uuid) -> TestUser {
    let user = anonymous_user();
    app.store.grant_role(user.user_id, "RFP_VENDOR");
    app.store.register_vendor(rfp_id, user.user_id);
    user
}

pub fn admin(app: &TestApp) -> TestUser {
    let user = anonymous_user();
    app.store.grant_role(user.user_id, "RFP_ADMIN");
    user
}
