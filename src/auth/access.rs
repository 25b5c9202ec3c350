//! Signed, short-lived access tokens (HS256 JWT).
//!
//! Access tokens are never stored: signature plus expiry is the whole
//! check.

use crate::error::{AuthFailure, Error, Result};
use anyhow::Context;
use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

/// Subject of every token; the deployment has a single owner.
pub const SUBJECT: &str = "owner";

/// Claims carried by an access token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccessClaims {
    pub sub: String,
    /// Issued at (Unix seconds)
    pub iat: i64,
    /// Expires at (Unix seconds)
    pub exp: i64,
    /// Unique token id, for log correlation
    pub jti: String,
}

/// A freshly minted access token.
#[derive(Debug, Clone)]
pub struct AccessToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Issues and verifies access tokens with one shared HMAC key.
#[derive(Clone)]
pub struct AccessTokens {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl AccessTokens {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expired by one second means expired
        validation.leeway = 0;
        validation.validate_aud = false;
        validation.set_required_spec_claims(&["exp", "sub"]);
        validation.sub = Some(SUBJECT.to_string());

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Signs a new token expiring `ttl` from now.
    pub fn issue(&self) -> Result<AccessToken> {
        let issued_at = Utc::now();
        let ttl = chrono::Duration::from_std(self.ttl)
            .context("Access token TTL out of range")
            .map_err(Error::Internal)?;
        let expires_at = issued_at + ttl;

        let claims = AccessClaims {
            sub: SUBJECT.to_string(),
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .context("Failed to sign access token")
            .map_err(Error::Internal)?;

        Ok(AccessToken { token, expires_at })
    }

    /// Checks signature, algorithm, subject and expiry.
    pub fn verify(&self, token: &str) -> Result<AccessClaims> {
        decode::<AccessClaims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "Access token validation failed");
                Error::Unauthorized(AuthFailure::InvalidAccessToken)
            })
    }
}
