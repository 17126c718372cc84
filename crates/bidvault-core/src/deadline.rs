//! Proposal deadline phases.
//!
//! `proposal_due` splits an RFP's life in two: uploads are allowed while
//! `now <= proposal_due`, downloads only once `now > proposal_due`. The
//! boundary instant itself belongs to the submission phase.

use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeadlinePhase {
    /// `now <= proposal_due`: writes allowed, reads refused
    Submission,
    /// `now > proposal_due`: reads allowed, writes refused
    Evaluation,
}

impl DeadlinePhase {
    pub fn at(proposal_due: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        if now <= proposal_due {
            DeadlinePhase::Submission
        } else {
            DeadlinePhase::Evaluation
        }
    }

    pub fn uploads_allowed(self) -> bool {
        self == DeadlinePhase::Submission
    }

    pub fn downloads_allowed(self) -> bool {
        self == DeadlinePhase::Evaluation
    }
}

/// Milliseconds left until `proposal_due`, zero once it has passed.
pub fn remaining_ms(proposal_due: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (proposal_due - now).num_milliseconds().max(0)
}
