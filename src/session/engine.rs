//! Session lifecycle: issue, rotate, revoke and look up.
//!
//! A session is a pair of credentials. The access token is a short-lived JWT
//! naming the session id; the session secret is an opaque random string that
//! is stored only as a salted hash and can be exchanged exactly once for a new
//! pair. Rotation runs these checks in order, stopping at the first failure:
//!
//! 1. the session must exist and be live,
//! 2. the presented secret must match the stored hash (no state change on mismatch),
//! 3. the device fingerprint must match, otherwise every live session of the
//!    subject is revoked,
//! 4. a changed network origin raises an alert but does not stop the rotation,
//! 5. the old session is retired and its successor created in one atomic step.

use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::{
    codec::TokenCodec,
    error::{HashError, SessionError},
    hasher::SecretHasher,
    notifier::{NotificationDispatcher, OriginAlert},
    record::NewSession,
    secret::generate_session_secret,
    store::SessionStore,
};

/// Credentials handed to the client after issue or rotation.
pub struct IssuedSession {
    pub session_id: Uuid,
    pub access_token: String,
    pub session_secret: String,
}

impl std::fmt::Debug for IssuedSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IssuedSession")
            .field("session_id", &self.session_id)
            .field("access_token", &"[REDACTED]")
            .field("session_secret", &"[REDACTED]")
            .finish()
    }
}

pub struct SessionEngine {
    store: Arc<dyn SessionStore>,
    hasher: Arc<dyn SecretHasher>,
    codec: Arc<dyn TokenCodec>,
    notifications: NotificationDispatcher,
}

impl std::fmt::Debug for SessionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionEngine")
            .field("notifications", &self.notifications)
            .finish_non_exhaustive()
    }
}

impl SessionEngine {
    pub fn new(
        store: Arc<dyn SessionStore>,
        hasher: Arc<dyn SecretHasher>,
        codec: Arc<dyn TokenCodec>,
        notifications: NotificationDispatcher,
    ) -> Self {
        Self {
            store,
            hasher,
            codec,
            notifications,
        }
    }

    /// Start a new session for `subject_id`, bound to the caller's device and origin.
    ///
    /// # Errors
    /// Fails only on infrastructure errors (randomness, hashing, signing, storage).
    #[instrument(skip(self, device_fingerprint), fields(session_id))]
    pub async fn issue_session(
        &self,
        subject_id: Uuid,
        device_fingerprint: &str,
        network_origin: &str,
    ) -> Result<IssuedSession, SessionError> {
        let (session, issued) = self
            .mint(subject_id, device_fingerprint, network_origin)
            .await?;
        self.store.create(session).await?;

        tracing::Span::current().record("session_id", tracing::field::display(issued.session_id));
        info!("session issued");
        Ok(issued)
    }

    /// Exchange a live session and its secret for a fresh credential pair.
    ///
    /// # Errors
    /// `SessionNotFound` for unknown, spent or concurrently rotated sessions,
    /// `InvalidSecret` on a wrong secret, `DeviceMismatch` after revoking every
    /// session of the subject. Infrastructure failures pass through.
    #[instrument(skip(self, presented_secret, device_fingerprint))]
    pub async fn rotate_session(
        &self,
        session_id: Uuid,
        presented_secret: &str,
        device_fingerprint: &str,
        network_origin: &str,
    ) -> Result<IssuedSession, SessionError> {
        let Some(record) = self.store.find_live(session_id).await? else {
            self.trace_missing(session_id).await;
            return Err(SessionError::SessionNotFound);
        };

        if !self
            .verify_secret(presented_secret.to_owned(), record.secret_hash.clone())
            .await?
        {
            warn!(subject_id = %record.subject_id, "session secret mismatch");
            return Err(SessionError::InvalidSecret);
        }

        if record.device_fingerprint != device_fingerprint {
            let revoked = self.store.deactivate_subject(record.subject_id).await?;
            warn!(
                subject_id = %record.subject_id,
                revoked,
                "device fingerprint changed, subject deauthorized"
            );
            return Err(SessionError::DeviceMismatch);
        }

        if record.network_origin != network_origin {
            info!(
                subject_id = %record.subject_id,
                previous = %record.network_origin,
                current = %network_origin,
                "network origin changed"
            );
            self.notifications.enqueue(OriginAlert::new(
                record.subject_id,
                record.network_origin.clone(),
                network_origin.to_string(),
                device_fingerprint.to_string(),
            ));
        }

        let (successor, issued) = self
            .mint(record.subject_id, device_fingerprint, network_origin)
            .await?;

        match self.store.replace(record.id, successor).await? {
            Some(_) => {
                info!(successor_id = %issued.session_id, "session rotated");
                Ok(issued)
            }
            None => {
                warn!("session retired by a concurrent request");
                Err(SessionError::SessionNotFound)
            }
        }
    }

    /// # Errors
    /// Returns an error if the store cannot be read.
    pub async fn is_session_live(&self, session_id: Uuid) -> Result<bool, SessionError> {
        Ok(self.store.is_live(session_id).await?)
    }

    /// # Errors
    /// Returns an error if the store does not answer.
    pub async fn store_ready(&self) -> Result<(), SessionError> {
        Ok(self.store.ping().await?)
    }

    /// Revoke every live session of `subject_id`. Revoking nothing is not an error.
    ///
    /// # Errors
    /// Returns an error if the store cannot be written.
    #[instrument(skip(self))]
    pub async fn deauthorize_subject(&self, subject_id: Uuid) -> Result<u64, SessionError> {
        let revoked = self.store.deactivate_subject(subject_id).await?;
        info!(revoked, "subject deauthorized");
        Ok(revoked)
    }

    /// Subject owning a live session.
    ///
    /// # Errors
    /// `SessionNotFound` if the session is unknown or no longer live.
    pub async fn subject_of(&self, session_id: Uuid) -> Result<Uuid, SessionError> {
        match self.store.find_live(session_id).await? {
            Some(record) => Ok(record.subject_id),
            None => {
                self.trace_missing(session_id).await;
                Err(SessionError::SessionNotFound)
            }
        }
    }

    /// Check an access token's signature and expiry, then that its session is
    /// still live. Returns the session id.
    ///
    /// # Errors
    /// `InvalidAccessToken` for bad tokens, `SessionNotFound` for revoked sessions.
    pub async fn verify_access_token(&self, access_token: &str) -> Result<Uuid, SessionError> {
        let claims = self
            .codec
            .verify(access_token)
            .map_err(SessionError::InvalidAccessToken)?;

        if !self.store.is_live(claims.refresh_token_id).await? {
            debug!(session_id = %claims.refresh_token_id, "access token for inactive session");
            return Err(SessionError::SessionNotFound);
        }
        Ok(claims.refresh_token_id)
    }

    /// Build a session record and its credentials without storing anything.
    /// The token is signed before the record is persisted so a signing failure
    /// never leaves a live session behind.
    async fn mint(
        &self,
        subject_id: Uuid,
        device_fingerprint: &str,
        network_origin: &str,
    ) -> Result<(NewSession, IssuedSession), SessionError> {
        let session_id = Uuid::new_v4();
        let session_secret = generate_session_secret()?;
        let secret_hash = self.hash_secret(session_secret.clone()).await?;
        let access_token = self
            .codec
            .sign(session_id)
            .map_err(SessionError::CredentialSigning)?;

        let session = NewSession {
            id: session_id,
            subject_id,
            secret_hash,
            device_fingerprint: device_fingerprint.to_string(),
            network_origin: network_origin.to_string(),
        };
        let issued = IssuedSession {
            session_id,
            access_token,
            session_secret,
        };
        Ok((session, issued))
    }

    async fn hash_secret(&self, secret: String) -> Result<String, SessionError> {
        let hasher = self.hasher.clone();
        let hash = tokio::task::spawn_blocking(move || hasher.hash(&secret))
            .await
            .map_err(HashError::Join)??;
        Ok(hash)
    }

    async fn verify_secret(&self, secret: String, stored_hash: String) -> Result<bool, SessionError> {
        let hasher = self.hasher.clone();
        let matched = tokio::task::spawn_blocking(move || hasher.verify(&secret, &stored_hash))
            .await
            .map_err(HashError::Join)??;
        Ok(matched)
    }

    /// Distinguish reuse of a spent session from an unknown id in the logs.
    /// Callers see `SessionNotFound` either way.
    async fn trace_missing(&self, session_id: Uuid) {
        match self.store.find(session_id).await {
            Ok(Some(record)) => warn!(
                %session_id,
                subject_id = %record.subject_id,
                "spent session presented again"
            ),
            Ok(None) => debug!(%session_id, "unknown session"),
            Err(err) => debug!(%session_id, "session lookup failed: {err}"),
        }
    }
}
