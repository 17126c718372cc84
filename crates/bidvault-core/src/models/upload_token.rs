use crate::error::AppError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

/// Which envelope of a bid a file belongs to
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionType {
    Technical,
    Commercial,
}

impl SubmissionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionType::Technical => "technical",
            SubmissionType::Commercial => "commercial",
        }
    }
}

impl Display for SubmissionType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubmissionType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "technical" => Ok(SubmissionType::Technical),
            "commercial" => Ok(SubmissionType::Commercial),
            _ => Err(AppError::InvalidInput(
                "Valid submission type (technical/commercial) required".to_string(),
            )),
        }
    }
}

/// A single-purpose write credential issued for one submission slot.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UploadToken {
    pub id: Uuid,
    pub rfp_id: Uuid,
    pub vendor_id: Uuid,
    pub submission_type: SubmissionType,
    pub storage_key: String,
    pub presigned_url: String,
    pub expires_at: DateTime<Utc>,
    pub used: bool,
    pub created_by: Uuid,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
    pub used_at: Option<DateTime<Utc>>,
}

impl UploadToken {
    /// Unused and not yet expired.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        !self.used && self.expires_at > now
    }

    /// Whole seconds of validity left, floored at zero.
    pub fn remaining_secs(&self, now: DateTime<Utc>) -> u64 {
        (self.expires_at - now).num_seconds().max(0) as u64
    }
}

/// Insert payload for an upload token
#[derive(Debug, Clone)]
pub struct NewUploadToken {
    pub rfp_id: Uuid,
    pub vendor_id: Uuid,
    pub submission_type: SubmissionType,
    pub storage_key: String,
    pub presigned_url: String,
    pub expires_at: DateTime<Utc>,
    pub created_by: Uuid,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}
