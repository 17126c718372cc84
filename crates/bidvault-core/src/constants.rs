//! Protocol constants shared by the gates and the storage layer.

/// Validity window of an upload (PUT) credential.
pub const UPLOAD_URL_TTL_SECS: u64 = 3600;

/// Validity window of a download (GET) credential.
pub const DOWNLOAD_URL_TTL_SECS: u64 = 3600;

/// Bucket sealed bids are written to when none is configured.
pub const DEFAULT_BID_BUCKET: &str = "oc-bids";

/// Filename used when the caller does not supply one, or supplies one that
/// sanitizes to nothing usable.
pub const DEFAULT_SUBMISSION_FILENAME: &str = "submission.pdf";

/// Top-level prefix of every sealed-bid storage key.
pub const STORAGE_KEY_PREFIX: &str = "rfp";

/// Maximum length of a sanitized filename segment.
pub const MAX_FILENAME_LEN: usize = 255;

/// RFP statuses in which the upload window may be open.
pub const SUBMISSION_STATUSES: [&str; 2] = ["published", "open"];
