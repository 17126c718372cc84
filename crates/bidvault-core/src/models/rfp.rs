use crate::constants::SUBMISSION_STATUSES;
use crate::deadline::DeadlinePhase;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Request for Proposal: the parent record gating the submission window.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Rfp {
    pub id: Uuid,
    pub proposal_due: DateTime<Utc>,
    /// Lifecycle status as stored (`draft`, `published`, `open`, ...)
    pub status: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RfpStatus {
    Draft,
    Published,
    Open,
    /// Anything past the submission window (closed, awarded, cancelled, ...)
    Other,
}

impl RfpStatus {
    pub fn parse(status: &str) -> Self {
        match status.trim().to_ascii_lowercase().as_str() {
            "draft" => RfpStatus::Draft,
            "published" => RfpStatus::Published,
            "open" => RfpStatus::Open,
            _ => RfpStatus::Other,
        }
    }
}

impl Rfp {
    pub fn status(&self) -> RfpStatus {
        RfpStatus::parse(&self.status)
    }

    /// Whether the status alone allows submissions (the deadline is checked separately).
    pub fn accepts_submissions(&self) -> bool {
        let status = self.status.trim().to_ascii_lowercase();
        SUBMISSION_STATUSES.contains(&status.as_str())
    }

    pub fn phase_at(&self, now: DateTime<Utc>) -> DeadlinePhase {
        DeadlinePhase::at(self.proposal_due, now)
    }
}
