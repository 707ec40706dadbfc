//! Request authentication.
//!
//! Identity is owned by an external session authority reached through
//! [`Storage::actor_for_token`](crate::store::Storage::actor_for_token).
//! HTTP requests present the token as the `session_token` cookie or a bearer
//! header; websocket upgrades pass it as `?token=`.

use axum::extract::FromRef;
use axum::http::StatusCode;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum_extra::extract::cookie::{Cookie, CookieJar};
use frames::Actor;

use crate::state::AppState;

const COOKIE_NAME: &str = "session_token";

// =============================================================================
// AUTH EXTRACTOR
// =============================================================================

/// Authenticated actor extracted from the session cookie or bearer token.
/// Use as a handler parameter to require authentication.
pub struct AuthUser {
    pub actor: Actor,
}

impl<S> axum::extract::FromRequestParts<S> for AuthUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = request_token(parts).ok_or(StatusCode::UNAUTHORIZED)?;
        let app_state = AppState::from_ref(state);
        let actor = resolve_token(&app_state, &token).await?;
        Ok(Self { actor })
    }
}

/// Session token from cookie, falling back to `Authorization: Bearer`.
pub(crate) fn request_token(parts: &Parts) -> Option<String> {
    let jar = CookieJar::from_headers(&parts.headers);
    if let Some(token) = jar.get(COOKIE_NAME).map(Cookie::value).filter(|t| !t.is_empty()) {
        return Some(token.to_owned());
    }
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_owned)
}

/// Resolve a token to its actor.
pub(crate) async fn resolve_token(state: &AppState, token: &str) -> Result<Actor, StatusCode> {
    state
        .storage
        .actor_for_token(token)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "session lookup failed");
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .ok_or(StatusCode::UNAUTHORIZED)
}
