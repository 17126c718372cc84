use super::bid_submission::BidSubmission;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AccessAction {
    /// First successful download after the deadline
    Opened,
    /// Every later successful download
    Accessed,
    /// Upload completed and the submission was locked
    Sealed,
}

impl AccessAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessAction::Opened => "opened",
            AccessAction::Accessed => "accessed",
            AccessAction::Sealed => "sealed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "opened" => Some(AccessAction::Opened),
            "accessed" => Some(AccessAction::Accessed),
            "sealed" | "sealed_by_lambda" => Some(AccessAction::Sealed),
            _ => None,
        }
    }
}

/// Append-only record of one access event on a submission.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AccessLogEntry {
    pub id: Uuid,
    pub submission_id: Uuid,
    pub action: AccessAction,
    pub user_id: Option<Uuid>,
    #[schema(value_type = Object)]
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewAccessLogEntry {
    pub submission_id: Uuid,
    pub action: AccessAction,
    pub user_id: Option<Uuid>,
    pub metadata: serde_json::Value,
}

/// A granted download, recorded together with the first-open transition.
#[derive(Debug, Clone)]
pub struct DownloadAccess {
    pub submission_id: Uuid,
    pub user_id: Uuid,
    pub at: DateTime<Utc>,
    /// Request context (client address, user agent)
    pub metadata: serde_json::Value,
}

impl DownloadAccess {
    /// Log row for this download once the store has decided `action`.
    pub fn entry_for(&self, action: AccessAction) -> NewAccessLogEntry {
        let time_key = match action {
            AccessAction::Opened => "opened_at",
            _ => "accessed_at",
        };
        let mut metadata = match &self.metadata {
            serde_json::Value::Object(_) => self.metadata.clone(),
            _ => serde_json::json!({}),
        };
        metadata[time_key] = serde_json::json!(self.at);

        NewAccessLogEntry {
            submission_id: self.submission_id,
            action,
            user_id: Some(self.user_id),
            metadata,
        }
    }
}

/// Result of [`DownloadAccess`] being written.
#[derive(Debug, Clone)]
pub struct RecordedDownload {
    /// `Opened` for the call that set `opened_at`, `Accessed` otherwise
    pub action: AccessAction,
    pub submission: BidSubmission,
    pub entry: AccessLogEntry,
}
