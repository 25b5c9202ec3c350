//! Authentication: password login, access tokens, refresh-token lifecycle.
//!
//! Login checks one configured password in constant time and issues an
//! access token plus a refresh token. Refresh tokens live in the token store
//! as hashed keys with an issued/expiry/revoked record; rotation and logout
//! flip `revoked` with a compare-and-swap so a token is spent at most once.
//! Already issued access tokens stay valid until they expire.

mod access;
mod refresh;

pub use access::{AccessClaims, AccessToken, AccessTokens, SUBJECT};
pub use refresh::RefreshRecord;

use crate::audit::{AuditEvent, RevocationCause, log_audit_event};
use crate::config::{AuthConfig, Secret};
use crate::error::{AuthFailure, Error, Result};
use crate::services::tokens::TokenStore;
use anyhow::Context;
use serde::Serialize;
use std::time::Duration;
use subtle::ConstantTimeEq;

/// Tokens handed to a client after login or refresh.
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
}

/// Password check plus token issuance, validation and revocation.
///
/// # Thread Safety
///
/// `AuthService` is `Clone` and can be shared across request handlers.
#[derive(Clone)]
pub struct AuthService {
    password: Secret,
    access: AccessTokens,
    tokens: TokenStore,
    refresh_ttl: Duration,
    rotate: bool,
}

impl AuthService {
    pub fn new(config: &AuthConfig, tokens: TokenStore) -> Self {
        Self {
            password: config.password.clone(),
            access: AccessTokens::new(config.token_secret.expose().as_bytes(), config.access_ttl()),
            tokens,
            refresh_ttl: config.refresh_ttl(),
            rotate: config.rotate_refresh_tokens,
        }
    }

    pub fn access_ttl(&self) -> Duration {
        self.access.ttl()
    }

    pub fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }

    /// Constant-time password comparison.
    ///
    /// Both sides are hashed first so the comparison length is fixed.
    fn password_matches(&self, candidate: &str) -> bool {
        let expected = blake3::hash(self.password.expose().as_bytes());
        let candidate = blake3::hash(candidate.as_bytes());
        !self.password.is_empty() && bool::from(expected.as_bytes().ct_eq(candidate.as_bytes()))
    }

    /// Exchanges the password for a fresh token pair.
    pub async fn login(&self, password: &str) -> Result<TokenPair> {
        if !self.password_matches(password) {
            return Err(Error::Unauthorized(AuthFailure::InvalidCredentials));
        }

        let refresh_token = self.store_refresh_token().await?;
        self.pair(refresh_token)
    }

    /// Validates an access token.
    pub fn verify_access(&self, token: &str) -> Result<AccessClaims> {
        self.access.verify(token)
    }

    /// Mints a new access token for an active refresh token.
    ///
    /// With rotation on, the presented token is revoked and replaced; of
    /// concurrent refreshes with the same token only one succeeds.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair> {
        let invalid = || Error::Unauthorized(AuthFailure::InvalidRefreshToken);

        let key = refresh::storage_key(refresh_token);
        let (raw, record) = self.load_record(&key).await?.ok_or_else(invalid)?;
        if !record.is_active() {
            return Err(invalid());
        }

        if !self.rotate {
            return self.pair(refresh_token.to_string());
        }

        if !self.revoke_record(&key, &raw, &record).await? {
            // Spent by a concurrent refresh or logout
            return Err(invalid());
        }
        log_audit_event(AuditEvent::RefreshTokenRevoked {
            token: refresh::fingerprint(refresh_token),
            cause: RevocationCause::Rotation,
        });

        let rotated = self.store_refresh_token().await?;
        self.pair(rotated)
    }

    /// Revokes a refresh token.
    ///
    /// Returns `false` if the token was unknown, expired or already revoked.
    /// Access tokens issued from it remain valid until they expire.
    pub async fn logout(&self, refresh_token: &str) -> Result<bool> {
        let key = refresh::storage_key(refresh_token);
        let Some((raw, record)) = self.load_record(&key).await? else {
            return Ok(false);
        };
        if !record.is_active() || !self.revoke_record(&key, &raw, &record).await? {
            return Ok(false);
        }

        log_audit_event(AuditEvent::RefreshTokenRevoked {
            token: refresh::fingerprint(refresh_token),
            cause: RevocationCause::Logout,
        });
        Ok(true)
    }

    /// Drops expired refresh records from the token store.
    pub async fn purge_expired(&self) -> Result<usize> {
        self.tokens.purge_expired().await.map_err(Error::unavailable)
    }

    fn pair(&self, refresh_token: String) -> Result<TokenPair> {
        let access = self.access.issue()?;
        Ok(TokenPair {
            access_token: access.token,
            refresh_token,
            token_type: "bearer",
        })
    }

    async fn store_refresh_token(&self) -> Result<String> {
        let token = refresh::generate();
        let record = RefreshRecord::issue(self.refresh_ttl);
        let json = serde_json::to_vec(&record)
            .context("Failed to serialize refresh record")
            .map_err(Error::Internal)?;

        self.tokens
            .set(&refresh::storage_key(&token), &json, Some(record.remaining()))
            .await
            .map_err(Error::unavailable)?;

        Ok(token)
    }

    async fn load_record(&self, key: &str) -> Result<Option<(Vec<u8>, RefreshRecord)>> {
        let Some(raw) = self.tokens.get(key).await.map_err(Error::unavailable)? else {
            return Ok(None);
        };
        let record = serde_json::from_slice(&raw)
            .context("Corrupt refresh token record")
            .map_err(Error::Internal)?;
        Ok(Some((raw, record)))
    }

    /// Marks the record revoked if it is still exactly `raw`.
    ///
    /// Revoked records are kept until their original expiry.
    async fn revoke_record(&self, key: &str, raw: &[u8], record: &RefreshRecord) -> Result<bool> {
        let json = serde_json::to_vec(&record.revoked())
            .context("Failed to serialize refresh record")
            .map_err(Error::Internal)?;
        self.tokens
            .compare_and_swap(key, raw, &json, Some(record.remaining()))
            .await
            .map_err(Error::unavailable)
    }
}
