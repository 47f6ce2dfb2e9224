//! Entity store backed by `SQLite`.
//!
//! ## Tables
//!
//! - `providers` - Care provider profiles, keyed by email
//! - `seekers` - Care seeker profiles, keyed by email
//! - `skills` - (email, skill) tags attachable to either role
//! - `matches` - Recorded provider/seeker pairings with a status
//! - `conversation_log` - Append-only chat history, ordered per email by `seq`
//!
//! # Migrations
//!
//! Migrations are stored in `crates/server/migrations/` and embedded in the
//! binary. Run them via:
//! ```bash
//! cargo run -p helper-cli -- migrate
//! ```
//!
//! # Writes
//!
//! Every read-modify-write sequence (profile merges, match recording, sequence
//! assignment in the conversation log) runs under one store-wide async mutex
//! and inside a transaction. Plain reads go straight to the pool.

pub mod conversation;
pub mod matches;
pub mod providers;
pub mod query;
pub mod seekers;
pub mod skills;

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use secrecy::{ExposeSecret, SecretString};
use sqlx::SqlitePool;
use sqlx::error::ErrorKind;
use sqlx::migrate::Migrator;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::instrument;

use helper_core::Email;

pub use conversation::ConversationRepository;
pub use matches::MatchRepository;
pub use providers::ProviderRepository;
pub use query::{DynamicQuery, QueryError, QueryFilter, QueryPlan, QueryTable, QueryValue};
pub use seekers::SeekerRepository;
pub use skills::SkillRepository;

/// Embedded schema migrations.
pub static MIGRATOR: Migrator = sqlx::migrate!();

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Schema migration failed.
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., negative rate).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

impl RepositoryError {
    /// Classify an error returned by a write statement.
    pub(crate) fn from_write(err: sqlx::Error) -> Self {
        let kind = err.as_database_error().map(sqlx::error::DatabaseError::kind);
        match kind {
            Some(
                ErrorKind::UniqueViolation
                | ErrorKind::CheckViolation
                | ErrorKind::NotNullViolation
                | ErrorKind::ForeignKeyViolation,
            ) => Self::Conflict(err.to_string()),
            _ => Self::Database(err),
        }
    }

    /// Whether this is a lookup miss rather than a storage failure.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}

/// Create a `SQLite` connection pool with sensible defaults.
///
/// The database file is created if missing and opened in WAL mode.
///
/// # Arguments
///
/// * `database_url` - `SQLite` connection string, e.g. `sqlite://helper.db?mode=rwc`
///
/// # Errors
///
/// Returns `sqlx::Error` if the URL is malformed or the database cannot be opened.
pub async fn create_pool(database_url: &SecretString) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url.expose_secret())?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5));

    SqlitePoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(10))
        .connect_with(options)
        .await
}

/// Open a private in-memory database with the schema applied.
///
/// The pool holds exactly one connection for its whole life, since every
/// `SQLite` in-memory connection is its own database.
///
/// # Errors
///
/// Returns `RepositoryError` if the connection or a migration fails.
pub async fn connect_in_memory() -> Result<SqlitePool, RepositoryError> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;

    MIGRATOR.run(&pool).await?;
    Ok(pool)
}

/// Apply any pending migrations.
///
/// # Errors
///
/// Returns `RepositoryError::Migration` if a migration fails.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), RepositoryError> {
    MIGRATOR.run(pool).await?;
    Ok(())
}

/// Handle to the entity store.
///
/// Cheap to clone; all clones share the pool and the write lock.
#[derive(Clone)]
pub struct Store {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    pool: SqlitePool,
    write_lock: Mutex<()>,
}

impl Store {
    /// Wrap a pool whose schema is already migrated.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                pool,
                write_lock: Mutex::new(()),
            }),
        }
    }

    /// Open an in-memory store with the schema applied.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the database cannot be created.
    pub async fn in_memory() -> Result<Self, RepositoryError> {
        Ok(Self::new(connect_in_memory().await?))
    }

    /// Underlying connection pool.
    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.inner.pool
    }

    /// Provider profile operations.
    #[must_use]
    pub fn providers(&self) -> ProviderRepository<'_> {
        ProviderRepository::new(&self.inner.pool, &self.inner.write_lock)
    }

    /// Seeker profile operations.
    #[must_use]
    pub fn seekers(&self) -> SeekerRepository<'_> {
        SeekerRepository::new(&self.inner.pool, &self.inner.write_lock)
    }

    /// Skill tag operations.
    #[must_use]
    pub fn skills(&self) -> SkillRepository<'_> {
        SkillRepository::new(&self.inner.pool)
    }

    /// Recorded match operations.
    #[must_use]
    pub fn matches(&self) -> MatchRepository<'_> {
        MatchRepository::new(&self.inner.pool, &self.inner.write_lock)
    }

    /// Conversation log operations.
    #[must_use]
    pub fn conversations(&self) -> ConversationRepository<'_> {
        ConversationRepository::new(&self.inner.pool, &self.inner.write_lock)
    }

    /// Make sure a newly identified participant has a row to merge into.
    ///
    /// Seeds an empty seeker row when the email has neither a provider nor a
    /// seeker profile. Returns `true` if a row was created.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    #[instrument(skip(self), fields(email = %email))]
    pub async fn ensure_participant(&self, email: &Email) -> Result<bool, RepositoryError> {
        let _guard = self.inner.write_lock.lock().await;
        let mut tx = self.inner.pool.begin().await?;

        let known: i64 = sqlx::query_scalar(
            r"
            SELECT (SELECT COUNT(*) FROM providers WHERE email = ?1)
                 + (SELECT COUNT(*) FROM seekers WHERE email = ?1)
            ",
        )
        .bind(email)
        .fetch_one(&mut *tx)
        .await?;

        if known > 0 {
            return Ok(false);
        }

        sqlx::query("INSERT INTO seekers (email, created_at) VALUES (?, ?)")
            .bind(email)
            .bind(Utc::now())
            .execute(&mut *tx)
            .await
            .map_err(RepositoryError::from_write)?;

        tx.commit().await?;
        tracing::info!("Seeded profile row for new participant");
        Ok(true)
    }
}
