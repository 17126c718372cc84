//! Error types module
//!
//! All failures of the gates are unified under `AppError`. Each precondition of
//! the upload and download gates has its own variant so callers receive a
//! reason code that separates "try again later" from "this will never succeed".
//!
//! The `Database` variant and `From<sqlx::Error>` are gated behind the `sqlx` feature.

use chrono::{DateTime, Utc};
use std::io;

#[cfg(feature = "sqlx")]
use sqlx::Error as SqlxError;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like failed preconditions
    Debug,
    /// Warning level - for recoverable issues
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata for error responses - defines how an error should be presented
pub trait ErrorMetadata {
    /// HTTP status code to return
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "DEADLINE_PASSED")
    fn error_code(&self) -> &'static str;

    /// Whether this error is recoverable (can be retried)
    fn is_recoverable(&self) -> bool;

    /// Suggested action for the client
    fn suggested_action(&self) -> Option<&'static str>;

    /// Client-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Whether details should be hidden in production
    fn is_sensitive(&self) -> bool;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[cfg(feature = "sqlx")]
    #[error("Database error: {0}")]
    Database(#[source] SqlxError),

    #[cfg(not(feature = "sqlx"))]
    #[error("Database error: {0}")]
    Database(String),

    #[error("Insufficient permissions: {0}")]
    InsufficientPermissions(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("RFP is not open for submissions (status: {status})")]
    SubmissionsClosed { status: String },

    #[error("Proposal due date {proposal_due} has passed")]
    DeadlinePassed { proposal_due: DateTime<Utc> },

    #[error("Proposal deadline {proposal_due} has not passed yet ({remaining_ms} ms remaining)")]
    DeadlineNotYetPassed {
        proposal_due: DateTime<Utc>,
        current_time: DateTime<Utc>,
        remaining_ms: i64,
    },

    #[error("No submission record found for vendor on this RFP")]
    NoSubmissionRecord,

    #[error("Submission is not sealed")]
    NotSealed,

    #[error("Submission slot is already sealed")]
    AlreadySealed,

    #[error("Failed to persist upload token: {0}")]
    TokenPersist(String),

    #[error("Failed to mint storage credential: {0}")]
    CredentialMint(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

#[cfg(feature = "sqlx")]
impl From<SqlxError> for AppError {
    fn from(err: SqlxError) -> Self {
        AppError::Database(err)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        AppError::Internal(format!("IO error: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InvalidInput(format!("JSON parsing error: {}", err))
    }
}

impl From<uuid::Error> for AppError {
    fn from(err: uuid::Error) -> Self {
        AppError::InvalidInput(format!("UUID parsing error: {}", err))
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::InvalidInput(format!("Validation error: {}", err))
    }
}

/// Static metadata for each variant: (http_status, error_code, recoverable, suggested_action, sensitive, log_level).
fn app_error_static_metadata(
    err: &AppError,
) -> (
    u16,
    &'static str,
    bool,
    Option<&'static str>,
    bool,
    LogLevel,
) {
    match err {
        AppError::Database(_) => (
            500,
            "DATABASE_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::InsufficientPermissions(_) => (
            403,
            "INSUFFICIENT_PERMISSIONS",
            false,
            Some("Request the required RFP role from an administrator"),
            false,
            LogLevel::Debug,
        ),
        AppError::NotFound(_) => (
            404,
            "NOT_FOUND",
            false,
            Some("Verify the resource ID exists"),
            false,
            LogLevel::Debug,
        ),
        AppError::SubmissionsClosed { .. } => (
            403,
            "SUBMISSIONS_CLOSED",
            false,
            Some("Submissions are only accepted while the RFP is published or open"),
            false,
            LogLevel::Debug,
        ),
        AppError::DeadlinePassed { .. } => (
            403,
            "DEADLINE_PASSED",
            false,
            None,
            false,
            LogLevel::Debug,
        ),
        AppError::DeadlineNotYetPassed { .. } => (
            403,
            "DEADLINE_NOT_YET_PASSED",
            true,
            Some("Retry after the proposal deadline"),
            false,
            LogLevel::Debug,
        ),
        AppError::NoSubmissionRecord => (
            404,
            "NO_SUBMISSION_RECORD",
            false,
            Some("Register a submission for this RFP before uploading"),
            false,
            LogLevel::Debug,
        ),
        AppError::NotSealed => (
            403,
            "NOT_SEALED",
            false,
            None,
            false,
            LogLevel::Debug,
        ),
        AppError::AlreadySealed => (
            409,
            "ALREADY_SEALED",
            false,
            Some("A sealed bid cannot be replaced"),
            false,
            LogLevel::Debug,
        ),
        AppError::TokenPersist(_) => (
            500,
            "TOKEN_PERSIST_ERROR",
            true,
            Some("Request a new upload URL"),
            true,
            LogLevel::Error,
        ),
        AppError::CredentialMint(_) => (
            500,
            "CREDENTIAL_MINT_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::InvalidInput(_) => (
            400,
            "INVALID_INPUT",
            false,
            Some("Check request parameters and try again"),
            false,
            LogLevel::Debug,
        ),
        AppError::Unauthorized(_) => (
            401,
            "UNAUTHORIZED",
            false,
            Some("Check the bearer token"),
            false,
            LogLevel::Debug,
        ),
        AppError::Internal(_) | AppError::InternalWithSource { .. } => (
            500,
            "INTERNAL_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
    }
}

impl AppError {
    /// Get the error type name for detailed error responses
    pub fn error_type(&self) -> &str {
        match self {
            AppError::Database(_) => "Database",
            AppError::InsufficientPermissions(_) => "InsufficientPermissions",
            AppError::NotFound(_) => "NotFound",
            AppError::SubmissionsClosed { .. } => "SubmissionsClosed",
            AppError::DeadlinePassed { .. } => "DeadlinePassed",
            AppError::DeadlineNotYetPassed { .. } => "DeadlineNotYetPassed",
            AppError::NoSubmissionRecord => "NoSubmissionRecord",
            AppError::NotSealed => "NotSealed",
            AppError::AlreadySealed => "AlreadySealed",
            AppError::TokenPersist(_) => "TokenPersist",
            AppError::CredentialMint(_) => "CredentialMint",
            AppError::InvalidInput(_) => "InvalidInput",
            AppError::Unauthorized(_) => "Unauthorized",
            AppError::Internal(_) => "Internal",
            AppError::InternalWithSource { .. } => "Internal",
        }
    }

    /// Structured hints for the client, beyond the message.
    pub fn context(&self) -> Option<serde_json::Value> {
        match self {
            AppError::DeadlinePassed { proposal_due } => Some(serde_json::json!({
                "proposal_due": proposal_due,
            })),
            AppError::DeadlineNotYetPassed {
                proposal_due,
                current_time,
                remaining_ms,
            } => Some(serde_json::json!({
                "proposal_due": proposal_due,
                "current_time": current_time,
                "time_remaining_ms": remaining_ms,
                "time_remaining": format!("{} minutes", (remaining_ms + 59_999) / 60_000),
            })),
            AppError::SubmissionsClosed { status } => Some(serde_json::json!({
                "status": status,
            })),
            _ => None,
        }
    }

    /// Get detailed error information including error chain
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        let mut details = self.to_string();

        let mut source = self.source();
        let mut depth = 0;
        while let Some(err) = source {
            depth += 1;
            if depth > 5 {
                details.push_str("\n  ... (truncated)");
                break;
            }
            details.push_str(&format!("\n  Caused by: {}", err));
            source = err.source();
        }

        details
    }
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        app_error_static_metadata(self).0
    }

    fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).1
    }

    fn is_recoverable(&self) -> bool {
        app_error_static_metadata(self).2
    }

    fn suggested_action(&self) -> Option<&'static str> {
        app_error_static_metadata(self).3
    }

    fn is_sensitive(&self) -> bool {
        app_error_static_metadata(self).4
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).5
    }

    fn client_message(&self) -> String {
        match self {
            AppError::Database(_) => "Failed to access database".to_string(),
            AppError::InsufficientPermissions(ref msg) => msg.clone(),
            AppError::NotFound(ref msg) => msg.clone(),
            AppError::SubmissionsClosed { .. } => "RFP is not open for submissions".to_string(),
            AppError::DeadlinePassed { .. } => {
                "Proposal due date has passed, upload not allowed".to_string()
            }
            AppError::DeadlineNotYetPassed { .. } => "Access denied. Bid submissions cannot be accessed until after the proposal deadline.".to_string(),
            AppError::NoSubmissionRecord => "No submission found for vendor".to_string(),
            AppError::NotSealed => {
                "Submission is not sealed and cannot be accessed".to_string()
            }
            AppError::AlreadySealed => {
                "Submission is sealed and can no longer be uploaded".to_string()
            }
            AppError::TokenPersist(_) => "Failed to create upload token".to_string(),
            AppError::CredentialMint(_) => "Failed to generate storage URL".to_string(),
            AppError::InvalidInput(ref msg) => msg.clone(),
            AppError::Unauthorized(ref msg) => msg.clone(),
            AppError::Internal(_) => "Internal server error".to_string(),
            AppError::InternalWithSource { .. } => "Internal server error".to_string(),
        }
    }
}
