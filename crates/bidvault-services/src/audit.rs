//! Security audit logging
//!
//! Two sinks:
//! - structured `audit`-target tracing events for every security-relevant
//!   decision (authentication, upload credential issuance, bid access, sealing)
//! - the persisted, append-only submission access log
//!
//! Access-log rows are written by the stores together with the state change
//! they record; [`log_access`] mirrors each one into the audit stream.

use bidvault_core::models::{AccessAction, AccessLogEntry};
use bidvault_core::AppError;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Audit event types for categorization
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    AuthenticationSuccess,
    AuthenticationFailure,
    /// A new upload credential was minted
    UploadTokenIssued,
    /// A live upload credential was handed out again
    UploadTokenReused,
    /// A gate refused a request
    AccessDenied,
    BidOpened,
    BidAccessed,
    BidSealed,
}

impl From<AccessAction> for AuditEventType {
    fn from(action: AccessAction) -> Self {
        match action {
            AccessAction::Opened => AuditEventType::BidOpened,
            AccessAction::Accessed => AuditEventType::BidAccessed,
            AccessAction::Sealed => AuditEventType::BidSealed,
        }
    }
}

/// Structured audit log entry
#[derive(Debug, Serialize)]
pub struct AuditLogEntry {
    pub timestamp: DateTime<Utc>,
    pub event_type: AuditEventType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rfp_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submission_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl AuditLogEntry {
    pub fn new(event_type: AuditEventType) -> Self {
        Self {
            timestamp: Utc::now(),
            event_type,
            user_id: None,
            rfp_id: None,
            submission_id: None,
            client_ip: None,
            user_agent: None,
            details: None,
            success: true,
            error_message: None,
        }
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_user_id(mut self, user_id: Option<Uuid>) -> Self {
        self.user_id = user_id;
        self
    }

    pub fn with_rfp_id(mut self, rfp_id: Uuid) -> Self {
        self.rfp_id = Some(rfp_id);
        self
    }

    pub fn with_submission_id(mut self, submission_id: Uuid) -> Self {
        self.submission_id = Some(submission_id);
        self
    }

    pub fn with_client(mut self, client_ip: Option<String>, user_agent: Option<String>) -> Self {
        self.client_ip = client_ip;
        self.user_agent = user_agent;
        self
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Mark as failure
    pub fn with_failure(mut self, error_message: impl Into<String>) -> Self {
        self.success = false;
        self.error_message = Some(error_message.into());
        self
    }

    /// Log the audit entry under the `audit` target
    pub fn log(&self) {
        let json = serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string());

        if self.success {
            tracing::event!(
                target: "audit",
                tracing::Level::INFO,
                audit_entry = %json,
                event_type = ?self.event_type,
                user_id = ?self.user_id,
                rfp_id = ?self.rfp_id,
                submission_id = ?self.submission_id,
                success = self.success,
                "Security audit log"
            );
        } else {
            tracing::event!(
                target: "audit",
                tracing::Level::WARN,
                audit_entry = %json,
                event_type = ?self.event_type,
                user_id = ?self.user_id,
                rfp_id = ?self.rfp_id,
                submission_id = ?self.submission_id,
                success = self.success,
                error = ?self.error_message,
                "Security audit log - failure"
            );
        }
    }
}

/// Log a bearer authentication attempt
pub fn log_authentication(
    user_id: Option<Uuid>,
    client_ip: Option<String>,
    user_agent: Option<String>,
    error_message: Option<String>,
) {
    let entry = match error_message {
        None => AuditLogEntry::new(AuditEventType::AuthenticationSuccess),
        Some(msg) => AuditLogEntry::new(AuditEventType::AuthenticationFailure).with_failure(msg),
    };
    entry
        .with_user_id(user_id)
        .with_client(client_ip, user_agent)
        .log();
}

/// Log a refused gate request
pub fn log_access_denied(
    operation: &str,
    user_id: Uuid,
    rfp_id: Option<Uuid>,
    submission_id: Option<Uuid>,
    error: &AppError,
) {
    let mut entry = AuditLogEntry::new(AuditEventType::AccessDenied)
        .with_user_id(Some(user_id))
        .with_details(serde_json::json!({ "operation": operation }))
        .with_failure(error.to_string());
    entry.rfp_id = rfp_id;
    entry.submission_id = submission_id;
    entry.log();
}

/// Mirror a persisted access-log row as an audit event.
pub fn log_access(entry: &AccessLogEntry) {
    AuditLogEntry::new(entry.action.into())
        .at(entry.created_at)
        .with_user_id(entry.user_id)
        .with_submission_id(entry.submission_id)
        .with_details(entry.metadata.clone())
        .log();
}
