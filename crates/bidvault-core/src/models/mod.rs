//! Domain models for the sealed-bid vault.

pub mod access_log;
pub mod bid_submission;
pub mod rfp;
pub mod upload_token;

pub use access_log::{
    AccessAction, AccessLogEntry, DownloadAccess, NewAccessLogEntry, RecordedDownload,
};
pub use bid_submission::{BidSubmission, SealOutcome, SealedUpload, VendorSubmission};
pub use rfp::{Rfp, RfpStatus};
pub use upload_token::{NewUploadToken, SubmissionType, UploadToken};
