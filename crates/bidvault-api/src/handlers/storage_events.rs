//! Storage event webhook
//!
//! Receives `ObjectCreated` notifications for the bid bucket and hands them to
//! the sealer. The feed authenticates with a shared secret, not a user token.

use crate::auth::middleware::bearer_token;
use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;
use axum::{extract::State, http::HeaderMap, Json};
use bidvault_core::AppError;
use bidvault_services::{SealReport, StorageEventNotification};
use bytes::Bytes;
use std::sync::Arc;
use subtle::ConstantTimeEq;

fn secure_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

#[utoipa::path(
    post,
    path = "/storage-events",
    tag = "storage",
    request_body = StorageEventNotification,
    responses(
        (status = 200, description = "Notification processed", body = SealReport),
        (status = 400, description = "Malformed notification", body = ErrorResponse),
        (status = 401, description = "Missing or wrong event secret", body = ErrorResponse),
        (status = 404, description = "Webhook not enabled", body = ErrorResponse),
        (status = 500, description = "Database failure; the feed should redeliver", body = ErrorResponse)
    ),
    security(("event_secret" = []))
)]
#[tracing::instrument(skip(state, headers, body), fields(operation = "storage_events"))]
pub async fn receive_storage_events(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<SealReport>, HttpAppError> {
    let secret = state
        .security
        .storage_event_secret
        .as_deref()
        .ok_or_else(|| AppError::NotFound("Storage event webhook is not enabled".to_string()))?;

    let token = bearer_token(&headers)?;
    if !secure_compare(token, secret) {
        tracing::warn!("Storage event rejected: wrong secret");
        return Err(AppError::Unauthorized("Invalid event secret".to_string()).into());
    }

    let notification: StorageEventNotification = serde_json::from_slice(&body)?;
    let report = state.services.sealer.process(notification).await?;

    tracing::info!(
        processed = report.processed,
        sealed = report.sealed,
        skipped = report.skipped,
        "Storage events processed"
    );

    Ok(Json(report))
}
