//! Durable session storage.
//!
//! The engine owns no mutable state; every coordination point between
//! concurrent requests is a conditional write in the store. `replace` is the
//! one place where two writes must land together: the predecessor is spent
//! iff it was still live, and only then is the successor inserted.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgRow, Connection, FromRow, PgPool, Row};
use tracing::Instrument;
use uuid::Uuid;

use super::{
    error::StoreError,
    record::{NewSession, SessionRecord},
};

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Persist a new live record.
    async fn create(&self, session: NewSession) -> Result<SessionRecord, StoreError>;

    /// Look up a record regardless of state. Used for audit signals only.
    async fn find(&self, id: Uuid) -> Result<Option<SessionRecord>, StoreError>;

    /// Look up a record only if it is still live.
    async fn find_live(&self, id: Uuid) -> Result<Option<SessionRecord>, StoreError>;

    async fn is_live(&self, id: Uuid) -> Result<bool, StoreError>;

    /// Deactivate every live record of `subject_id`, returning how many changed.
    async fn deactivate_subject(&self, subject_id: Uuid) -> Result<u64, StoreError>;

    /// Atomically spend `predecessor` and insert `successor`.
    ///
    /// Returns `None` without inserting anything when `predecessor` was no
    /// longer live, i.e. a concurrent rotation or revocation got there first.
    async fn replace(
        &self,
        predecessor: Uuid,
        successor: NewSession,
    ) -> Result<Option<SessionRecord>, StoreError>;

    /// Check that the backing storage answers.
    async fn ping(&self) -> Result<(), StoreError>;
}

/// Postgres-backed store over the `sessions` table (see `sql/schema.sql`).
#[derive(Clone, Debug)]
pub struct PgSessionStore {
    pool: PgPool,
}

impl PgSessionStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const SESSION_COLUMNS: &str = "id, subject_id, secret_hash, device_fingerprint, network_origin, deactivated_at, created_at";

fn db_span(operation: &'static str, statement: &str) -> tracing::Span {
    tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = operation,
        db.statement = statement
    )
}

impl<'r> FromRow<'r, PgRow> for SessionRecord {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            id: row.try_get("id")?,
            subject_id: row.try_get("subject_id")?,
            secret_hash: row.try_get("secret_hash")?,
            device_fingerprint: row.try_get("device_fingerprint")?,
            network_origin: row.try_get("network_origin")?,
            deactivated_at: row.try_get::<Option<DateTime<Utc>>, _>("deactivated_at")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

async fn insert_session<'e, E>(executor: E, session: NewSession) -> Result<SessionRecord, StoreError>
where
    E: sqlx::PgExecutor<'e>,
{
    let query = format!(
        r"
        INSERT INTO sessions
            (id, subject_id, secret_hash, device_fingerprint, network_origin)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING {SESSION_COLUMNS}
        "
    );
    let record = sqlx::query_as::<_, SessionRecord>(&query)
        .bind(session.id)
        .bind(session.subject_id)
        .bind(session.secret_hash)
        .bind(session.device_fingerprint)
        .bind(session.network_origin)
        .fetch_one(executor)
        .instrument(db_span("INSERT", &query))
        .await?;
    Ok(record)
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn create(&self, session: NewSession) -> Result<SessionRecord, StoreError> {
        insert_session(&self.pool, session).await
    }

    async fn find(&self, id: Uuid) -> Result<Option<SessionRecord>, StoreError> {
        let query = format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE id = $1");
        let record = sqlx::query_as::<_, SessionRecord>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .instrument(db_span("SELECT", &query))
            .await?;
        Ok(record)
    }

    async fn find_live(&self, id: Uuid) -> Result<Option<SessionRecord>, StoreError> {
        let query = format!(
            "SELECT {SESSION_COLUMNS} FROM sessions WHERE id = $1 AND deactivated_at IS NULL"
        );
        let record = sqlx::query_as::<_, SessionRecord>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .instrument(db_span("SELECT", &query))
            .await?;
        Ok(record)
    }

    async fn is_live(&self, id: Uuid) -> Result<bool, StoreError> {
        let query = "SELECT EXISTS (SELECT 1 FROM sessions WHERE id = $1 AND deactivated_at IS NULL)";
        let live: bool = sqlx::query_scalar(query)
            .bind(id)
            .fetch_one(&self.pool)
            .instrument(db_span("SELECT", query))
            .await?;
        Ok(live)
    }

    async fn deactivate_subject(&self, subject_id: Uuid) -> Result<u64, StoreError> {
        // Already-spent rows keep their original timestamp.
        let query = r"
            UPDATE sessions
            SET deactivated_at = NOW()
            WHERE subject_id = $1
              AND deactivated_at IS NULL
        ";
        let result = sqlx::query(query)
            .bind(subject_id)
            .execute(&self.pool)
            .instrument(db_span("UPDATE", query))
            .await?;
        Ok(result.rows_affected())
    }

    async fn replace(
        &self,
        predecessor: Uuid,
        successor: NewSession,
    ) -> Result<Option<SessionRecord>, StoreError> {
        let mut tx = self.pool.begin().await?;

        // The row lock taken here serializes concurrent rotations of the same id;
        // the loser sees `deactivated_at` set and matches nothing.
        let query = r"
            UPDATE sessions
            SET deactivated_at = NOW()
            WHERE id = $1
              AND deactivated_at IS NULL
            RETURNING id
        ";
        let spent: Option<Uuid> = sqlx::query_scalar(query)
            .bind(predecessor)
            .fetch_optional(&mut *tx)
            .instrument(db_span("UPDATE", query))
            .await?;

        if spent.is_none() {
            tx.rollback().await?;
            return Ok(None);
        }

        let record = insert_session(&mut *tx, successor).await?;
        tx.commit().await?;

        Ok(Some(record))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let acquire_span = tracing::info_span!(
            "db.acquire",
            db.system = "postgresql",
            db.operation = "ACQUIRE"
        );
        let mut conn = self.pool.acquire().instrument(acquire_span).await?;
        let ping_span = tracing::info_span!("db.ping", db.system = "postgresql", db.operation = "PING");
        conn.ping().instrument(ping_span).await?;
        Ok(())
    }
}
