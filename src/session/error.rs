//! Session engine errors.

use thiserror::Error;

/// Failures surfaced by the session engine.
///
/// The first four variants are authentication failures and must reach the
/// caller as one indistinguishable "unauthorized" answer.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session not found")]
    SessionNotFound,

    #[error("invalid session secret")]
    InvalidSecret,

    #[error("device fingerprint mismatch, subject deauthorized")]
    DeviceMismatch,

    #[error("invalid access token")]
    InvalidAccessToken(#[source] CodecError),

    #[error("storage error")]
    Persistence(#[from] StoreError),

    #[error("failed to sign access token")]
    CredentialSigning(#[source] CodecError),

    #[error("failed to generate session secret")]
    Randomness(#[source] rand::Error),

    #[error("failed to hash session secret")]
    Hashing(#[from] HashError),
}

impl SessionError {
    /// Whether the failure collapses to a 401 at the HTTP boundary.
    #[must_use]
    pub fn is_unauthenticated(&self) -> bool {
        matches!(
            self,
            Self::SessionNotFound
                | Self::InvalidSecret
                | Self::DeviceMismatch
                | Self::InvalidAccessToken(_)
        )
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error")]
    Sql(#[from] sqlx::Error),

    #[error("session store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("jwt error")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("missing refresh_token_id claim")]
    MissingSessionId,

    #[error("access token ttl out of range")]
    InvalidTtl,
}

#[derive(Debug, Error)]
pub enum HashError {
    #[error("argon2 error: {0}")]
    Argon2(String),

    #[error("malformed stored hash")]
    MalformedHash,

    #[error("hashing task failed")]
    Join(#[from] tokio::task::JoinError),
}

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("webhook request failed")]
    Request(#[from] reqwest::Error),

    #[error("webhook answered {0}")]
    Status(reqwest::StatusCode),

    #[error("webhook timed out after {0:?}")]
    Timeout(std::time::Duration),
}
