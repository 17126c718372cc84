pub mod download;
pub mod health;
pub mod storage_events;
pub mod submissions;
pub mod upload_url;

use bidvault_core::models::SubmissionType;
use bidvault_core::AppError;

/// Parse the `type` query parameter shared by the upload and status endpoints.
pub(crate) fn parse_submission_type(raw: Option<&str>) -> Result<SubmissionType, AppError> {
    raw.ok_or_else(|| {
        AppError::InvalidInput("Valid submission type (technical/commercial) required".to_string())
    })?
    .parse()
}
