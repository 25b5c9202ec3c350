//! Typed error taxonomy for photo storage and authentication.
//!
//! Backends report failures through `anyhow`; the storage abstraction and
//! the auth service translate them into [`Error`] so the HTTP boundary can
//! map each kind to a status code and a fixed, non-leaking `detail` string.

use uuid::Uuid;

/// Result type for library and auth operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Why a request was refused as unauthenticated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    /// Password did not match the configured secret.
    InvalidCredentials,
    /// No access token was presented.
    MissingAccessToken,
    /// Access token is malformed, badly signed, or expired.
    InvalidAccessToken,
    /// Refresh token is unknown, revoked, or expired.
    InvalidRefreshToken,
}

impl AuthFailure {
    fn detail(self) -> &'static str {
        match self {
            Self::InvalidCredentials => "Invalid credentials",
            Self::MissingAccessToken => "Not authenticated",
            Self::InvalidAccessToken => "Invalid or expired access token",
            Self::InvalidRefreshToken => "Invalid or expired refresh token",
        }
    }
}

impl std::fmt::Display for AuthFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.detail())
    }
}

/// Errors surfaced by the storage abstraction, reconciler and auth service.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// No photo record with this id.
    #[error("photo not found: {id}")]
    PhotoNotFound { id: Uuid },

    /// The active provider reports the object key absent.
    #[error("object not found: {key}")]
    ObjectNotFound { key: String },

    /// Stale or missing `last_modified` on a metadata update.
    #[error("photo {id} has been modified since last retrieval")]
    Conflict { id: Uuid },

    /// Missing, invalid or expired credentials.
    #[error("unauthorized: {0}")]
    Unauthorized(AuthFailure),

    /// Provider or token store could not be reached or errored.
    #[error("storage backend unavailable: {0:#}")]
    BackendUnavailable(#[source] anyhow::Error),

    /// Malformed request payload.
    #[error("invalid request: {0}")]
    Validation(String),

    /// Anything else.
    #[error("internal error: {0:#}")]
    Internal(#[source] anyhow::Error),
}

impl Error {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn unavailable(source: impl Into<anyhow::Error>) -> Self {
        Self::BackendUnavailable(source.into())
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::PhotoNotFound { .. } | Self::ObjectNotFound { .. } => 404,
            Self::Conflict { .. } => 409,
            Self::Unauthorized(_) => 401,
            Self::Validation(_) => 422,
            Self::BackendUnavailable(_) => 503,
            Self::Internal(_) => 500,
        }
    }

    /// Human-readable message that is safe to return to clients.
    ///
    /// Never includes filesystem paths, object keys or provider messages.
    pub fn detail(&self) -> String {
        match self {
            Self::PhotoNotFound { .. } => "Photo not found".to_string(),
            Self::ObjectNotFound { .. } => "Image not found".to_string(),
            Self::Conflict { .. } => "Photo has been modified since last retrieval".to_string(),
            Self::Unauthorized(failure) => failure.detail().to_string(),
            Self::Validation(message) => message.clone(),
            Self::BackendUnavailable(_) => "Storage backend unavailable".to_string(),
            Self::Internal(_) => "Internal server error".to_string(),
        }
    }
}
