//! Bidvault Core Library
//!
//! This crate provides the domain models, role/capability checks, error types,
//! configuration and persistence traits shared across all bidvault components.

pub mod auth;
pub mod clock;
pub mod config;
pub mod constants;
pub mod deadline;
pub mod error;
pub mod models;
pub mod store;

// Re-export commonly used types
pub use auth::{authorize, Capability, Role, RoleSet};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{BaseConfig, Config, GateConfig, StorageConfig};
pub use deadline::DeadlinePhase;
pub use error::{AppError, ErrorMetadata, LogLevel};
