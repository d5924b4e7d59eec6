//! In-memory session store for tests and local experiments.

use async_trait::async_trait;
use chrono::Utc;
use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard},
};
use uuid::Uuid;

use super::{
    error::StoreError,
    record::{NewSession, SessionRecord},
    store::SessionStore,
};

/// `SessionStore` over a mutex-guarded map. Every operation holds the lock for
/// its full read-modify-write, which gives the same atomicity as the Postgres
/// store's conditional updates.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    records: Mutex<HashMap<Uuid, SessionRecord>>,
}

impl InMemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<Uuid, SessionRecord>>, StoreError> {
        self.records
            .lock()
            .map_err(|_| StoreError::Unavailable("session map poisoned".to_string()))
    }

    /// Every record of a subject, live or spent.
    ///
    /// # Errors
    /// Returns an error if the map lock is poisoned.
    pub fn records_for_subject(&self, subject_id: Uuid) -> Result<Vec<SessionRecord>, StoreError> {
        Ok(self
            .lock()?
            .values()
            .filter(|record| record.subject_id == subject_id)
            .cloned()
            .collect())
    }

    /// Total number of stored records.
    ///
    /// # Errors
    /// Returns an error if the map lock is poisoned.
    pub fn len(&self) -> Result<usize, StoreError> {
        Ok(self.lock()?.len())
    }

    /// # Errors
    /// Returns an error if the map lock is poisoned.
    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.lock()?.is_empty())
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn create(&self, session: NewSession) -> Result<SessionRecord, StoreError> {
        let mut records = self.lock()?;
        if records.contains_key(&session.id) {
            return Err(StoreError::Unavailable(format!(
                "duplicate session id {}",
                session.id
            )));
        }
        let record = session.into_record(Utc::now());
        records.insert(record.id, record.clone());
        Ok(record)
    }

    async fn find(&self, id: Uuid) -> Result<Option<SessionRecord>, StoreError> {
        Ok(self.lock()?.get(&id).cloned())
    }

    async fn find_live(&self, id: Uuid) -> Result<Option<SessionRecord>, StoreError> {
        Ok(self
            .lock()?
            .get(&id)
            .filter(|record| record.is_live())
            .cloned())
    }

    async fn is_live(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self.lock()?.get(&id).is_some_and(SessionRecord::is_live))
    }

    async fn deactivate_subject(&self, subject_id: Uuid) -> Result<u64, StoreError> {
        let now = Utc::now();
        let mut changed = 0;
        for record in self.lock()?.values_mut() {
            if record.subject_id == subject_id && record.is_live() {
                record.deactivated_at = Some(now);
                changed += 1;
            }
        }
        Ok(changed)
    }

    async fn replace(
        &self,
        predecessor: Uuid,
        successor: NewSession,
    ) -> Result<Option<SessionRecord>, StoreError> {
        let mut records = self.lock()?;
        if records.contains_key(&successor.id) {
            return Err(StoreError::Unavailable(format!(
                "duplicate session id {}",
                successor.id
            )));
        }
        let now = Utc::now();
        match records.get_mut(&predecessor) {
            Some(record) if record.is_live() => record.deactivated_at = Some(now),
            _ => return Ok(None),
        }
        let record = successor.into_record(now);
        records.insert(record.id, record.clone());
        Ok(Some(record))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.lock().map(|_| ())
    }
}
