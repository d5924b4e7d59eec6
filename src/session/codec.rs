//! Access token signing and verification.
//!
//! Access tokens are compact JWTs signed with a shared HS512 secret. The only
//! custom claim is `refresh_token_id`, the id of the session record the token
//! was issued for.

use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{config::SessionConfig, error::CodecError};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccessClaims {
    pub refresh_token_id: Uuid,
    pub exp: i64,
    pub iat: i64,
}

/// Signs and verifies access tokens.
pub trait TokenCodec: Send + Sync {
    /// Build a signed access token bound to `session_id`.
    fn sign(&self, session_id: Uuid) -> Result<String, CodecError>;

    /// Check signature, algorithm and expiry, and return the claims.
    fn verify(&self, token: &str) -> Result<AccessClaims, CodecError>;
}

#[derive(Clone)]
pub struct Hs512TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: chrono::Duration,
    validation: Validation,
}

impl Hs512TokenCodec {
    /// # Errors
    /// Returns `CodecError::InvalidTtl` if the configured TTL does not fit a timestamp offset.
    pub fn new(config: &SessionConfig) -> Result<Self, CodecError> {
        let secret = config.signing_secret().expose_secret().as_bytes();
        let ttl =
            chrono::Duration::from_std(config.access_token_ttl()).map_err(|_| CodecError::InvalidTtl)?;

        let mut validation = Validation::new(Algorithm::HS512);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "iat"]);

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            ttl,
            validation,
        })
    }

    fn encode_claims(&self, claims: &AccessClaims) -> Result<String, CodecError> {
        Ok(encode(
            &Header::new(Algorithm::HS512),
            claims,
            &self.encoding_key,
        )?)
    }
}

impl TokenCodec for Hs512TokenCodec {
    fn sign(&self, session_id: Uuid) -> Result<String, CodecError> {
        let now = Utc::now();
        let expires_at = now
            .checked_add_signed(self.ttl)
            .ok_or(CodecError::InvalidTtl)?;
        self.encode_claims(&AccessClaims {
            refresh_token_id: session_id,
            exp: expires_at.timestamp(),
            iat: now.timestamp(),
        })
    }

    fn verify(&self, token: &str) -> Result<AccessClaims, CodecError> {
        let data = decode::<AccessClaims>(token, &self.decoding_key, &self.validation)?;
        if data.claims.refresh_token_id.is_nil() {
            return Err(CodecError::MissingSessionId);
        }
        Ok(data.claims)
    }
}

impl std::fmt::Debug for Hs512TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hs512TokenCodec")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}
