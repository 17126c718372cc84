//! Storage key derivation for bid files.
//!
//! Key format: `rfp/{rfp_id}/{YYYY-MM-DD}/{vendor_id}/{submission_type}/{file_name}`.
//! The issuer derives keys with [`derive_storage_key`] and the sealer reads them
//! back with [`parse_storage_key`]; nothing else builds or splits keys.

use crate::traits::{StorageError, StorageResult};
use bidvault_core::constants::{DEFAULT_SUBMISSION_FILENAME, MAX_FILENAME_LEN, STORAGE_KEY_PREFIX};
use bidvault_core::models::SubmissionType;
use chrono::NaiveDate;
use uuid::Uuid;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Replace every character outside `[A-Za-z0-9._-]` with `_`.
///
/// Names that end up empty or made only of dots become `submission.pdf`, so a
/// file name can never address a parent segment. Output is capped at 255 bytes.
pub fn sanitize_filename(file_name: &str) -> String {
    let mut sanitized: String = file_name
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if sanitized.chars().all(|c| c == '.') {
        return DEFAULT_SUBMISSION_FILENAME.to_string();
    }

    // Only ASCII survives, so byte truncation is char-safe
    sanitized.truncate(MAX_FILENAME_LEN);
    sanitized
}

/// Build the object key for one submission slot.
pub fn derive_storage_key(
    rfp_id: Uuid,
    vendor_id: Uuid,
    submission_type: SubmissionType,
    file_name: &str,
    date: NaiveDate,
) -> String {
    format!(
        "{}/{}/{}/{}/{}/{}",
        STORAGE_KEY_PREFIX,
        rfp_id,
        date.format(DATE_FORMAT),
        vendor_id,
        submission_type,
        sanitize_filename(file_name)
    )
}

/// Components recovered from a bid object key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedStorageKey {
    pub rfp_id: Uuid,
    pub date: NaiveDate,
    pub vendor_id: Uuid,
    pub submission_type: SubmissionType,
    pub file_name: String,
}

/// Inverse of [`derive_storage_key`].
pub fn parse_storage_key(key: &str) -> StorageResult<ParsedStorageKey> {
    let invalid = || StorageError::InvalidKey(key.to_string());

    let parts: Vec<&str> = key.split('/').collect();
    if parts.len() != 6 || parts[0] != STORAGE_KEY_PREFIX {
        return Err(invalid());
    }

    let rfp_id = Uuid::parse_str(parts[1]).map_err(|_| invalid())?;
    let date = NaiveDate::parse_from_str(parts[2], DATE_FORMAT).map_err(|_| invalid())?;
    let vendor_id = Uuid::parse_str(parts[3]).map_err(|_| invalid())?;
    let submission_type: SubmissionType = parts[4].parse().map_err(|_| invalid())?;
    let file_name = parts[5];
    if file_name.is_empty() || sanitize_filename(file_name) != file_name {
        return Err(invalid());
    }

    Ok(ParsedStorageKey {
        rfp_id,
        date,
        vendor_id,
        submission_type,
        file_name: file_name.to_string(),
    })
}

/// Content type a PUT credential is signed for, by file extension.
pub fn content_type_for(file_name: &str) -> &'static str {
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "pdf" => "application/pdf",
        "zip" => "application/zip",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        _ => "application/octet-stream",
    }
}

/// Object tag string recording who a file belongs to.
pub fn submission_tagging(rfp_id: Uuid, vendor_id: Uuid, submission_type: SubmissionType) -> String {
    [
        ("rfp_id", rfp_id.to_string()),
        ("vendor_id", vendor_id.to_string()),
        ("submission_type", submission_type.to_string()),
    ]
    .iter()
    .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
    .collect::<Vec<_>>()
    .join("&")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids() -> (Uuid, Uuid) {
        (
            Uuid::parse_str("6f1c1b7e-3c1a-4c55-9a0e-1f9d8c1e2a10").unwrap(),
            Uuid::parse_str("0b6e4a3d-9f12-4c8b-a1d2-3e4f5a6b7c8d").unwrap(),
        )
    }

    #[test]
    fn test_sanitize_keeps_safe_characters() {
        assert_eq!(sanitize_filename("Bid_v2-final.pdf"), "Bid_v2-final.pdf");
    }

    #[test]
    fn test_sanitize_replaces_unsafe_characters() {
        assert_eq!(sanitize_filename("my bid (1).pdf"), "my_bid__1_.pdf");
        assert_eq!(sanitize_filename("../../etc/passwd"), ".._.._etc_passwd");
        assert_eq!(sanitize_filename("devis_é.pdf"), "devis__.pdf");
    }

    #[test]
    fn test_sanitize_falls_back_for_empty_or_dots() {
        assert_eq!(sanitize_filename(""), "submission.pdf");
        assert_eq!(sanitize_filename("   "), "submission.pdf");
        assert_eq!(sanitize_filename(".."), "submission.pdf");
        assert_eq!(sanitize_filename("."), "submission.pdf");
    }

    #[test]
    fn test_sanitize_caps_length() {
        let long = "a".repeat(400) + ".pdf";
        assert_eq!(sanitize_filename(&long).len(), 255);
    }

    #[test]
    fn test_derive_storage_key_layout() {
        let (rfp, vendor) = ids();
        let date = NaiveDate::from_ymd_opt(2025, 1, 10).unwrap();
        let key = derive_storage_key(rfp, vendor, SubmissionType::Technical, "tech bid.pdf", date);
        assert_eq!(
            key,
            format!("rfp/{}/2025-01-10/{}/technical/tech_bid.pdf", rfp, vendor)
        );
    }

    #[test]
    fn test_derive_is_deterministic() {
        let (rfp, vendor) = ids();
        let date = NaiveDate::from_ymd_opt(2025, 1, 10).unwrap();
        let a = derive_storage_key(rfp, vendor, SubmissionType::Commercial, "x.pdf", date);
        let b = derive_storage_key(rfp, vendor, SubmissionType::Commercial, "x.pdf", date);
        assert_eq!(a, b);
    }

    #[test]
    fn test_parse_recovers_components() {
        let (rfp, vendor) = ids();
        let date = NaiveDate::from_ymd_opt(2025, 1, 10).unwrap();
        let key = derive_storage_key(rfp, vendor, SubmissionType::Commercial, "price.xlsx", date);

        let parsed = parse_storage_key(&key).unwrap();
        assert_eq!(parsed.rfp_id, rfp);
        assert_eq!(parsed.vendor_id, vendor);
        assert_eq!(parsed.date, date);
        assert_eq!(parsed.submission_type, SubmissionType::Commercial);
        assert_eq!(parsed.file_name, "price.xlsx");
    }

    #[test]
    fn test_parse_rejects_foreign_keys() {
        let (rfp, vendor) = ids();
        assert!(parse_storage_key("media/abc.png").is_err());
        assert!(parse_storage_key(&format!("rfp/{}/2025-01-10/{}/technical", rfp, vendor)).is_err());
        assert!(parse_storage_key(&format!("rfp/{}/2025-13-40/{}/technical/a.pdf", rfp, vendor)).is_err());
        assert!(parse_storage_key(&format!("rfp/{}/2025-01-10/{}/pricing/a.pdf", rfp, vendor)).is_err());
        assert!(parse_storage_key(&format!("rfp/not-a-uuid/2025-01-10/{}/technical/a.pdf", vendor)).is_err());
        assert!(parse_storage_key(&format!("rfp/{}/2025-01-10/{}/technical/a b.pdf", rfp, vendor)).is_err());
    }

    #[test]
    fn test_content_type_for() {
        assert_eq!(content_type_for("bid.PDF"), "application/pdf");
        assert_eq!(content_type_for("sheet.xlsx"), "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet");
        assert_eq!(content_type_for("archive.zip"), "application/zip");
        assert_eq!(content_type_for("noext"), "application/octet-stream");
    }

    #[test]
    fn test_submission_tagging() {
        let (rfp, vendor) = ids();
        assert_eq!(
            submission_tagging(rfp, vendor, SubmissionType::Technical),
            format!("rfp_id={}&vendor_id={}&submission_type=technical", rfp, vendor)
        );
    }
}
