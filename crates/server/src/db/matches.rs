//! Database operations for recorded matches.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tokio::sync::Mutex;
use tracing::instrument;

use helper_core::{Email, MatchStatus};

use super::RepositoryError;
use crate::models::matching::MatchRecord;

/// Internal row type for match queries.
#[derive(Debug, sqlx::FromRow)]
struct MatchRow {
    provider_email: Email,
    seeker_email: Email,
    status: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<MatchRow> for MatchRecord {
    type Error = RepositoryError;

    fn try_from(row: MatchRow) -> Result<Self, Self::Error> {
        Ok(Self {
            provider_email: row.provider_email,
            seeker_email: row.seeker_email,
            status: row
                .status
                .parse()
                .map_err(RepositoryError::DataCorruption)?,
            created_at: row.created_at,
        })
    }
}

/// Repository for recorded provider/seeker pairings.
pub struct MatchRepository<'a> {
    pool: &'a SqlitePool,
    write_lock: &'a Mutex<()>,
}

impl<'a> MatchRepository<'a> {
    /// Create a new match repository.
    #[must_use]
    pub const fn new(pool: &'a SqlitePool, write_lock: &'a Mutex<()>) -> Self {
        Self { pool, write_lock }
    }

    /// Record a pairing, or update the status of an existing one.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self), fields(provider = %provider, seeker = %seeker, status = %status))]
    pub async fn record(
        &self,
        provider: &Email,
        seeker: &Email,
        status: MatchStatus,
    ) -> Result<MatchRecord, RepositoryError> {
        let _guard = self.write_lock.lock().await;
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r"
            INSERT INTO matches (provider_email, seeker_email, status, created_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT (provider_email, seeker_email)
            DO UPDATE SET status = excluded.status
            ",
        )
        .bind(provider)
        .bind(seeker)
        .bind(status.as_str())
        .bind(Utc::now())
        .execute(&mut *tx)
        .await
        .map_err(RepositoryError::from_write)?;

        let row = sqlx::query_as::<_, MatchRow>(
            r"
            SELECT provider_email, seeker_email, status, created_at
            FROM matches
            WHERE provider_email = ? AND seeker_email = ?
            ",
        )
        .bind(provider)
        .bind(seeker)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        row.try_into()
    }

    /// Pairings where `email` is on either side, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for(&self, email: &Email) -> Result<Vec<MatchRecord>, RepositoryError> {
        let rows = sqlx::query_as::<_, MatchRow>(
            r"
            SELECT provider_email, seeker_email, status, created_at
            FROM matches
            WHERE provider_email = ?1 OR seeker_email = ?1
            ORDER BY created_at DESC, provider_email, seeker_email
            ",
        )
        .bind(email)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }
}
