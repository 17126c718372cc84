//! Bidvault Storage Library
//!
//! Storage key derivation and presigned credential minting for sealed bids.
//!
//! # Storage key format
//!
//! `rfp/{rfp_id}/{YYYY-MM-DD}/{vendor_id}/{submission_type}/{file_name}`
//!
//! The file name segment is always sanitized to `[A-Za-z0-9._-]`, so keys never
//! contain `..` segments or a leading `/`. Key generation and parsing live in the
//! `keys` module so the issuer and the sealer cannot drift apart.

pub mod factory;
pub mod keys;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use factory::create_presigner;
pub use keys::{
    content_type_for, derive_storage_key, parse_storage_key, sanitize_filename,
    submission_tagging, ParsedStorageKey,
};
#[cfg(feature = "storage-s3")]
pub use s3::S3Presigner;
pub use traits::{Presigner, StorageError, StorageResult, UploadPresignRequest};
