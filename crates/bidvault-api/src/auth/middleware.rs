//! Bearer authentication for the gate endpoints.
//!
//! Validates the JWT, loads the caller's RFP roles and stores a
//! [`CallerContext`] in the request extensions. Every outcome is written to the
//! audit log.

use crate::auth::models::CallerContext;
use crate::error::HttpAppError;
use crate::state::AppState;
use crate::utils::ip_extraction::{extract_client_ip, extract_user_agent};
use axum::{
    extract::{ConnectInfo, Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};
use bidvault_core::{AppError, RoleSet};
use bidvault_services::audit::log_authentication;
use bidvault_services::Caller;
use std::net::SocketAddr;
use std::sync::Arc;
use uuid::Uuid;

/// Token part of an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AppError> {
    let header = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Missing authorization header".to_string()))?;

    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| {
            AppError::Unauthorized("Invalid authorization header format".to_string())
        })
}

async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<(Uuid, RoleSet), AppError> {
    let token = bearer_token(headers)?;
    let claims = state.security.jwt.validate_token(token)?;
    let roles = state.services.roles.roles_for(claims.sub).await?;
    Ok((claims.sub, roles))
}

pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let socket_addr = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let client_ip = extract_client_ip(
        request.headers(),
        socket_addr.as_ref(),
        state.security.trusted_proxy_count,
    );
    let user_agent = extract_user_agent(request.headers());

    match authenticate(&state, request.headers()).await {
        Ok((user_id, roles)) => {
            log_authentication(Some(user_id), client_ip.clone(), user_agent.clone(), None);

            let caller = Caller::new(user_id, roles).with_client(client_ip, user_agent);
            request.extensions_mut().insert(CallerContext(caller));
            next.run(request).await
        }
        Err(err) => {
            log_authentication(None, client_ip, user_agent, Some(err.to_string()));
            HttpAppError(err).into_response()
        }
    }
}
