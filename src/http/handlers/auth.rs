//! Login, token refresh and logout handlers.
//!
//! Login delivers both tokens as `HttpOnly` cookies. Refresh and logout read
//! the refresh token from the JSON body, falling back to the cookie.

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue, header};
use axum::response::{AppendHeaders, IntoResponse};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use super::super::AppState;
use super::super::error::AppError;
use super::super::extract::{ACCESS_COOKIE, ApiJson, ClientAddr, REFRESH_COOKIE, cookie, set_cookie};
use crate::audit::{AuditEvent, log_audit_event};
use crate::auth::TokenPair;
use crate::error::{AuthFailure, Error};

#[derive(Debug, Deserialize)]
pub(crate) struct LoginRequest {
    password: String,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RefreshTokenRequest {
    refresh_token: Option<String>,
}

/// Parses an optional `{"refresh_token": ...}` body, then falls back to the
/// refresh cookie.
fn refresh_token_from(headers: &HeaderMap, body: &Bytes) -> Result<Option<String>, AppError> {
    let request = if body.iter().all(u8::is_ascii_whitespace) {
        RefreshTokenRequest::default()
    } else {
        serde_json::from_slice(body)
            .map_err(|e| Error::validation(format!("Invalid request body: {e}")))?
    };

    Ok(request
        .refresh_token
        .filter(|token| !token.is_empty())
        .or_else(|| cookie(headers, REFRESH_COOKIE)))
}

fn token_cookies(state: &AppState, pair: &TokenPair) -> [(header::HeaderName, HeaderValue); 2] {
    let secure = state.cookie_secure;
    [
        (
            header::SET_COOKIE,
            set_cookie(ACCESS_COOKIE, &pair.access_token, "/", state.auth.access_ttl(), secure),
        ),
        (
            header::SET_COOKIE,
            set_cookie(REFRESH_COOKIE, &pair.refresh_token, "/", state.auth.refresh_ttl(), secure),
        ),
    ]
}

fn cleared_cookies(state: &AppState) -> [(header::HeaderName, HeaderValue); 2] {
    let secure = state.cookie_secure;
    [
        (header::SET_COOKIE, set_cookie(ACCESS_COOKIE, "", "/", Duration::ZERO, secure)),
        (header::SET_COOKIE, set_cookie(REFRESH_COOKIE, "", "/", Duration::ZERO, secure)),
    ]
}

/// POST /login - Exchange the password for tokens.
pub(crate) async fn login(
    State(state): State<AppState>,
    ClientAddr(remote_addr): ClientAddr,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let pair = match state.auth.login(&req.password).await {
        Ok(pair) => pair,
        Err(err) => {
            if matches!(err, Error::Unauthorized(_)) {
                log_audit_event(AuditEvent::LoginFailed { remote_addr });
            }
            return Err(err.into());
        },
    };
    log_audit_event(AuditEvent::LoginSucceeded { remote_addr });

    Ok((
        AppendHeaders(token_cookies(&state, &pair)),
        Json(json!({ "detail": "Login successful" })),
    ))
}

/// POST /refresh - Mint a new access token from a refresh token.
pub(crate) async fn refresh(
    State(state): State<AppState>,
    ClientAddr(remote_addr): ClientAddr,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let rejected = |reason| {
        log_audit_event(AuditEvent::RefreshTokenRejected {
            remote_addr,
            reason,
        });
        AppError(Error::Unauthorized(AuthFailure::InvalidRefreshToken))
    };

    let token = refresh_token_from(&headers, &body)?.ok_or_else(|| rejected("missing"))?;
    let pair = match state.auth.refresh(&token).await {
        Ok(pair) => pair,
        Err(Error::Unauthorized(_)) => return Err(rejected("unknown, revoked or expired")),
        Err(err) => return Err(err.into()),
    };

    Ok((AppendHeaders(token_cookies(&state, &pair)), Json(pair)))
}

/// POST /logout - Revoke the refresh token and clear auth cookies.
///
/// Always succeeds for unknown or already revoked tokens.
pub(crate) async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    if let Some(token) = refresh_token_from(&headers, &body)? {
        let revoked = state.auth.logout(&token).await?;
        tracing::debug!(revoked, "Logout");
    }

    Ok((
        AppendHeaders(cleared_cookies(&state)),
        Json(json!({ "detail": "Logged out" })),
    ))
}
