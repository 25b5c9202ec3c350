//! Access-token guard for protected routes.

use super::AppState;
use super::error::AppError;
use super::extract::{ACCESS_COOKIE, ClientAddr, bearer_token, cookie};
use crate::audit::{AuditEvent, log_audit_event};
use crate::error::{AuthFailure, Error};
use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;

/// Rejects requests without a valid access token.
///
/// The token is read from the `Authorization: Bearer` header first, then
/// from the `access_token` cookie. Verified claims are stored in the
/// request extensions.
pub async fn require_access_token(
    State(state): State<AppState>,
    ClientAddr(remote_addr): ClientAddr,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let headers = request.headers();
    let token = bearer_token(headers).or_else(|| cookie(headers, ACCESS_COOKIE));

    let path = request.uri().path().to_string();
    let Some(token) = token else {
        log_audit_event(AuditEvent::AccessTokenRejected {
            remote_addr,
            path,
            reason: "missing",
        });
        return Err(Error::Unauthorized(AuthFailure::MissingAccessToken).into());
    };

    match state.auth.verify_access(&token) {
        Ok(claims) => {
            request.extensions_mut().insert(claims);
            Ok(next.run(request).await)
        },
        Err(err) => {
            log_audit_event(AuditEvent::AccessTokenRejected {
                remote_addr,
                path,
                reason: "invalid or expired",
            });
            Err(err.into())
        },
    }
}
