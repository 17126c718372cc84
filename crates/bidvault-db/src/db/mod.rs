//! Database repositories for data access layer
//!
//! Each repository owns one table and implements the matching store trait.
//! Queries are built at runtime with `sqlx::query` so the crate compiles
//! without a live database.

pub mod access_log;
pub mod bid_submission;
pub mod rfp;
pub mod upload_token;

pub use access_log::AccessLogRepository;
pub use bid_submission::BidSubmissionRepository;
pub use rfp::{RfpRepository, UserRoleRepository, VendorSubmissionRepository};
pub use upload_token::UploadTokenRepository;

use bidvault_core::models::SubmissionType;

/// Decode a TEXT submission type column.
pub(crate) fn decode_submission_type(value: String) -> Result<SubmissionType, sqlx::Error> {
    value
        .parse()
        .map_err(|_| sqlx::Error::Decode(format!("unknown submission_type '{}'", value).into()))
}
