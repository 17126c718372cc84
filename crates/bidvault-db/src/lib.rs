//! Bidvault Database Library
//!
//! Postgres repositories implementing the persistence traits of `bidvault-core`.

pub mod db;

pub use db::{
    AccessLogRepository, BidSubmissionRepository, RfpRepository, UploadTokenRepository,
    UserRoleRepository, VendorSubmissionRepository,
};
