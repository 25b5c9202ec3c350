//! Opaque refresh tokens and their server-side records.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Token store key prefix for refresh token records.
pub const KEY_PREFIX: &str = "refresh:";

/// What the token store knows about one refresh token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RefreshRecord {
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub revoked: bool,
}

impl RefreshRecord {
    pub fn issue(ttl: Duration) -> Self {
        let issued_at = Utc::now();
        let expires_at = chrono::Duration::from_std(ttl)
            .ok()
            .and_then(|ttl| issued_at.checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        Self {
            issued_at,
            expires_at,
            revoked: false,
        }
    }

    /// Usable: not revoked and not past its expiry.
    pub fn is_active(&self) -> bool {
        !self.revoked && Utc::now() < self.expires_at
    }

    /// Time left before expiry, zero if already past.
    pub fn remaining(&self) -> Duration {
        (self.expires_at - Utc::now()).to_std().unwrap_or(Duration::ZERO)
    }

    pub fn revoked(&self) -> Self {
        Self {
            revoked: true,
            ..self.clone()
        }
    }
}

/// Generates a new token: 32 random bytes, base64url without padding.
pub fn generate() -> String {
    let bytes: [u8; 32] = rand::random();
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Token store key for `token`. Only a hash of the token is stored.
pub fn storage_key(token: &str) -> String {
    format!("{KEY_PREFIX}{}", blake3::hash(token.as_bytes()).to_hex())
}

/// Short fingerprint safe to write to logs.
pub fn fingerprint(token: &str) -> String {
    hex::encode(&blake3::hash(token.as_bytes()).as_bytes()[..6])
}
