//! Database operations for seeker profiles.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tokio::sync::Mutex;
use tracing::instrument;

use helper_core::Email;

use super::RepositoryError;
use crate::models::profile::{Seeker, SeekerFields, sanitize_amount};

/// Internal row type for seeker queries.
#[derive(Debug, sqlx::FromRow)]
struct SeekerRow {
    email: Email,
    name: String,
    care_needs: String,
    location: String,
    schedule_requirements: String,
    budget: f64,
    special_requirements: String,
    phone_number: String,
    created_at: DateTime<Utc>,
}

impl From<SeekerRow> for Seeker {
    fn from(row: SeekerRow) -> Self {
        Self {
            email: row.email,
            name: row.name,
            care_needs: row.care_needs,
            location: row.location,
            schedule_requirements: row.schedule_requirements,
            budget: sanitize_amount(row.budget),
            special_requirements: row.special_requirements,
            phone_number: row.phone_number,
            created_at: row.created_at,
        }
    }
}

const SELECT_SEEKER: &str = r"
    SELECT email, name, care_needs, location, schedule_requirements, budget,
           special_requirements, phone_number, created_at
    FROM seekers
";

/// Repository for seeker profile operations.
pub struct SeekerRepository<'a> {
    pool: &'a SqlitePool,
    write_lock: &'a Mutex<()>,
}

impl<'a> SeekerRepository<'a> {
    /// Create a new seeker repository.
    #[must_use]
    pub const fn new(pool: &'a SqlitePool, write_lock: &'a Mutex<()>) -> Self {
        Self { pool, write_lock }
    }

    /// Insert or merge a seeker profile.
    ///
    /// Same policy as [`ProviderRepository::upsert`](super::ProviderRepository::upsert):
    /// `created_at` is set once, and only informative fields overwrite.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` on a constraint violation,
    /// `RepositoryError::Database` for other failures.
    #[instrument(skip(self, fields), fields(email = %email))]
    pub async fn upsert(
        &self,
        email: &Email,
        fields: &SeekerFields,
    ) -> Result<Seeker, RepositoryError> {
        let _guard = self.write_lock.lock().await;
        let mut tx = self.pool.begin().await?;

        let existing = sqlx::query_as::<_, SeekerRow>(&format!("{SELECT_SEEKER} WHERE email = ?"))
            .bind(email)
            .fetch_optional(&mut *tx)
            .await?;

        let seeker = if let Some(row) = existing {
            let mut seeker = Seeker::from(row);
            seeker.merge(fields);

            sqlx::query(
                r"
                UPDATE seekers
                SET name = ?, care_needs = ?, location = ?, schedule_requirements = ?,
                    budget = ?, special_requirements = ?, phone_number = ?
                WHERE email = ?
                ",
            )
            .bind(&seeker.name)
            .bind(&seeker.care_needs)
            .bind(&seeker.location)
            .bind(&seeker.schedule_requirements)
            .bind(seeker.budget)
            .bind(&seeker.special_requirements)
            .bind(&seeker.phone_number)
            .bind(&seeker.email)
            .execute(&mut *tx)
            .await
            .map_err(RepositoryError::from_write)?;

            seeker
        } else {
            let seeker = Seeker::new(email.clone(), fields, Utc::now());

            sqlx::query(
                r"
                INSERT INTO seekers (
                    email, name, care_needs, location, schedule_requirements,
                    budget, special_requirements, phone_number, created_at
                )
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                ",
            )
            .bind(&seeker.email)
            .bind(&seeker.name)
            .bind(&seeker.care_needs)
            .bind(&seeker.location)
            .bind(&seeker.schedule_requirements)
            .bind(seeker.budget)
            .bind(&seeker.special_requirements)
            .bind(&seeker.phone_number)
            .bind(seeker.created_at)
            .execute(&mut *tx)
            .await
            .map_err(RepositoryError::from_write)?;

            seeker
        };

        tx.commit().await?;
        Ok(seeker)
    }

    /// Get a seeker by email.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no seeker has this email.
    pub async fn get(&self, email: &Email) -> Result<Seeker, RepositoryError> {
        self.find(email).await?.ok_or(RepositoryError::NotFound)
    }

    /// Look up a seeker by email.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find(&self, email: &Email) -> Result<Option<Seeker>, RepositoryError> {
        let row = sqlx::query_as::<_, SeekerRow>(&format!("{SELECT_SEEKER} WHERE email = ?"))
            .bind(email)
            .fetch_optional(self.pool)
            .await?;

        Ok(row.map(Into::into))
    }

    /// List all seekers, ordered by email.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Seeker>, RepositoryError> {
        let rows = sqlx::query_as::<_, SeekerRow>(&format!("{SELECT_SEEKER} ORDER BY email"))
            .fetch_all(self.pool)
            .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Seekers whose location contains `location` (case-insensitive,
    /// literal) and whose budget covers `rate`, highest budget first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn affording(
        &self,
        location: &str,
        rate: f64,
    ) -> Result<Vec<Seeker>, RepositoryError> {
        let rows = sqlx::query_as::<_, SeekerRow>(&format!(
            "{SELECT_SEEKER}
             WHERE instr(lower(location), lower(?)) > 0
               AND budget >= ?
             ORDER BY budget DESC, email ASC"
        ))
        .bind(location)
        .bind(rate)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::Store;

    #[tokio::test]
    async fn test_seeker_merge_preserves_earlier_fields() {
        let store = Store::in_memory().await.unwrap();
        let repo = store.seekers();
        let who = Email::parse("patient1@example.com").unwrap();

        repo.upsert(
            &who,
            &SeekerFields {
                care_needs: "mobility assistance".to_string(),
                phone_number: "555-0100".to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        let merged = repo
            .upsert(
                &who,
                &SeekerFields {
                    location: "New York, NY".to_string(),
                    budget: 40.0,
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(merged.care_needs, "mobility assistance");
        assert_eq!(merged.phone_number, "555-0100");
        assert_eq!(merged.location, "New York, NY");
        assert_eq!(repo.get(&who).await.unwrap(), merged);
    }

    #[tokio::test]
    async fn test_affording_orders_by_budget_descending() {
        let store = Store::in_memory().await.unwrap();
        let repo = store.seekers();
        for (who, budget) in [("low@example.com", 30.0), ("high@example.com", 60.0)] {
            repo.upsert(
                &Email::parse(who).unwrap(),
                &SeekerFields {
                    location: "Chicago, IL".to_string(),
                    budget,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        }

        let found = repo.affording("chicago", 25.0).await.unwrap();
        let emails: Vec<&str> = found.iter().map(|s| s.email.as_str()).collect();
        assert_eq!(emails, vec!["high@example.com", "low@example.com"]);

        assert!(repo.affording("chicago", 100.0).await.unwrap().is_empty());
    }
}
