//! Security audit logging.
//!
//! Structured events on the `audit` tracing target for authentication
//! outcomes, refresh-token revocations and rejected object keys.

use std::net::SocketAddr;
use tracing::{info, warn};

/// Why a refresh token was revoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevocationCause {
    Logout,
    Rotation,
}

impl RevocationCause {
    fn as_str(self) -> &'static str {
        match self {
            Self::Logout => "logout",
            Self::Rotation => "rotation",
        }
    }
}

/// Security audit events that should be logged for monitoring and alerting.
#[derive(Debug, Clone)]
pub enum AuditEvent {
    /// Password accepted; tokens issued
    LoginSucceeded { remote_addr: Option<SocketAddr> },
    /// Password rejected
    LoginFailed { remote_addr: Option<SocketAddr> },
    /// Protected request without a usable access token
    AccessTokenRejected {
        remote_addr: Option<SocketAddr>,
        path: String,
        reason: &'static str,
    },
    /// Refresh or logout with an unknown, revoked or expired refresh token
    RefreshTokenRejected {
        remote_addr: Option<SocketAddr>,
        reason: &'static str,
    },
    /// Refresh token marked revoked. `token` is a short fingerprint, never
    /// the token itself.
    RefreshTokenRevoked {
        token: String,
        cause: RevocationCause,
    },
    /// Object key that tried to escape the provider namespace
    PathTraversalBlocked { key: String },
}

fn addr(remote_addr: Option<SocketAddr>) -> String {
    remote_addr.map_or_else(|| "unknown".to_string(), |addr| addr.to_string())
}

/// Log a security audit event with structured fields.
pub fn log_audit_event(event: AuditEvent) {
    match event {
        AuditEvent::LoginSucceeded { remote_addr } => {
            info!(
                target: "audit",
                event_type = "login_success",
                remote_addr = %addr(remote_addr),
                "Login succeeded"
            );
        },
        AuditEvent::LoginFailed { remote_addr } => {
            warn!(
                target: "audit",
                event_type = "login_failure",
                remote_addr = %addr(remote_addr),
                "Login failed"
            );
        },
        AuditEvent::AccessTokenRejected {
            remote_addr,
            path,
            reason,
        } => {
            warn!(
                target: "audit",
                event_type = "access_token_rejected",
                remote_addr = %addr(remote_addr),
                %path,
                reason,
                "Access token rejected"
            );
        },
        AuditEvent::RefreshTokenRejected {
            remote_addr,
            reason,
        } => {
            warn!(
                target: "audit",
                event_type = "refresh_token_rejected",
                remote_addr = %addr(remote_addr),
                reason,
                "Refresh token rejected"
            );
        },
        AuditEvent::RefreshTokenRevoked { token, cause } => {
            info!(
                target: "audit",
                event_type = "refresh_token_revoked",
                %token,
                cause = cause.as_str(),
                "Refresh token revoked"
            );
        },
        AuditEvent::PathTraversalBlocked { key } => {
            warn!(
                target: "audit",
                event_type = "path_traversal_blocked",
                %key,
                "Path traversal attempt blocked"
            );
        },
    }
}
