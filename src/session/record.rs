//! Persisted session record.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// One issued session credential, live or spent.
///
/// `id` is the rotation key embedded in the access token. Records are never
/// deleted; spent ones stay behind with `deactivated_at` set.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionRecord {
    pub id: Uuid,
    pub subject_id: Uuid,
    pub secret_hash: String,
    pub device_fingerprint: String,
    pub network_origin: String,
    pub deactivated_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl SessionRecord {
    /// Only live records can be rotated or pass bearer validation.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.deactivated_at.is_none()
    }
}

/// Insert shape for a new live record.
#[derive(Clone, Debug)]
pub struct NewSession {
    pub id: Uuid,
    pub subject_id: Uuid,
    pub secret_hash: String,
    pub device_fingerprint: String,
    pub network_origin: String,
}

impl NewSession {
    pub(crate) fn into_record(self, created_at: DateTime<Utc>) -> SessionRecord {
        SessionRecord {
            id: self.id,
            subject_id: self.subject_id,
            secret_hash: self.secret_hash,
            device_fingerprint: self.device_fingerprint,
            network_origin: self.network_origin,
            deactivated_at: None,
            created_at,
        }
    }
}
