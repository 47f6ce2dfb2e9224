//! Database operations for skill tags.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::instrument;

use helper_core::Email;

use super::RepositoryError;

/// Repository for (email, skill) tags.
///
/// Adds and removes are single statements, so no write lock is needed.
pub struct SkillRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> SkillRepository<'a> {
    /// Create a new skill repository.
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Attach a tag to a participant. Adding an existing pair is a no-op.
    ///
    /// Returns `true` if a new row was written. Blank tags are ignored.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self), fields(email = %email))]
    pub async fn add(&self, email: &Email, skill: &str) -> Result<bool, RepositoryError> {
        let skill = skill.trim();
        if skill.is_empty() {
            return Ok(false);
        }

        let result = sqlx::query(
            r"
            INSERT INTO skills (email, skill, created_at)
            VALUES (?, ?, ?)
            ON CONFLICT (email, skill) DO NOTHING
            ",
        )
        .bind(email)
        .bind(skill)
        .bind(Utc::now())
        .execute(self.pool)
        .await
        .map_err(RepositoryError::from_write)?;

        Ok(result.rows_affected() > 0)
    }

    /// Detach a tag. Returns `true` if the pair existed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self), fields(email = %email))]
    pub async fn remove(&self, email: &Email, skill: &str) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM skills WHERE email = ? AND skill = ?")
            .bind(email)
            .bind(skill.trim())
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Tags attached to a participant, alphabetically.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, email: &Email) -> Result<Vec<String>, RepositoryError> {
        let skills = sqlx::query_scalar("SELECT skill FROM skills WHERE email = ? ORDER BY skill")
            .bind(email)
            .fetch_all(self.pool)
            .await?;

        Ok(skills)
    }
}
