//! Bidvault API Library
//!
//! HTTP surface of the sealed-bid vault: bearer authentication, the upload and
//! download gates, the storage event webhook, status and review endpoints, and
//! application setup.

mod api_doc;
mod handlers;
mod telemetry;
mod utils;

pub mod auth;
pub mod error;
pub mod setup;
pub mod state;

pub use api_doc::get_openapi_spec;
pub use error::{ErrorResponse, HttpAppError};
pub use state::AppState;
