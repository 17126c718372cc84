//! OpenAPI documentation, served at `/api/openapi.json` and rendered by RapiDoc at `/docs`.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::error;
use crate::handlers;
use bidvault_core::models;
use bidvault_services::{sealer, SubmissionState};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
        components.add_security_scheme(
            "event_secret",
            SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Bidvault API",
        version = "0.1.0",
        description = "Sealed-bid submission vault. Vendors receive time-limited upload URLs while an RFP is open; administrators receive download URLs only after the proposal deadline. Every opening is recorded in an append-only access log."
    ),
    paths(
        handlers::upload_url::get_upload_url,
        handlers::download::download_bid_submission,
        handlers::submissions::get_submission_status,
        handlers::submissions::list_bid_submissions,
        handlers::submissions::get_access_log,
        handlers::storage_events::receive_storage_events,
        handlers::health::health_check,
    ),
    components(
        schemas(
            models::SubmissionType,
            models::AccessAction,
            models::AccessLogEntry,
            SubmissionState,
            handlers::upload_url::UploadUrlResponse,
            handlers::download::DownloadResponse,
            handlers::download::DownloadMetadata,
            handlers::submissions::SubmissionSummary,
            handlers::submissions::SubmissionStatusResponse,
            handlers::submissions::SubmissionListResponse,
            handlers::submissions::AccessLogResponse,
            sealer::StorageEventNotification,
            sealer::SealReport,
            handlers::health::HealthCheckResponse,
            error::ErrorResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "bids", description = "Upload and download gates for sealed bids"),
        (name = "review", description = "Administrator review of submissions and access history"),
        (name = "storage", description = "Object storage event webhook"),
        (name = "health", description = "Service health")
    )
)]
pub struct ApiDoc;

pub fn get_openapi_spec() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}
