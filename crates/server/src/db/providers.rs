//! Database operations for provider profiles.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tokio::sync::Mutex;
use tracing::instrument;

use helper_core::Email;

use super::RepositoryError;
use crate::models::profile::{Provider, ProviderFields, sanitize_amount};

// =============================================================================
// Internal Row Types
// =============================================================================

/// Internal row type for provider queries.
#[derive(Debug, sqlx::FromRow)]
struct ProviderRow {
    email: Email,
    name: String,
    experience: String,
    location: String,
    availability: String,
    specializations: String,
    rate_expectations: f64,
    certifications: String,
    created_at: DateTime<Utc>,
}

impl From<ProviderRow> for Provider {
    fn from(row: ProviderRow) -> Self {
        Self {
            email: row.email,
            name: row.name,
            experience: row.experience,
            location: row.location,
            availability: row.availability,
            specializations: row.specializations,
            rate_expectations: sanitize_amount(row.rate_expectations),
            certifications: row.certifications,
            created_at: row.created_at,
        }
    }
}

const SELECT_PROVIDER: &str = r"
    SELECT email, name, experience, location, availability, specializations,
           rate_expectations, certifications, created_at
    FROM providers
";

// =============================================================================
// Repository
// =============================================================================

/// Repository for provider profile operations.
pub struct ProviderRepository<'a> {
    pool: &'a SqlitePool,
    write_lock: &'a Mutex<()>,
}

impl<'a> ProviderRepository<'a> {
    /// Create a new provider repository.
    #[must_use]
    pub const fn new(pool: &'a SqlitePool, write_lock: &'a Mutex<()>) -> Self {
        Self { pool, write_lock }
    }

    /// Insert or merge a provider profile.
    ///
    /// A new email gets a fresh row stamped with the current time. An existing
    /// row keeps its `created_at` and only takes the informative incoming
    /// fields (see [`Provider::merge`]).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` on a constraint violation,
    /// `RepositoryError::Database` for other failures.
    #[instrument(skip(self, fields), fields(email = %email))]
    pub async fn upsert(
        &self,
        email: &Email,
        fields: &ProviderFields,
    ) -> Result<Provider, RepositoryError> {
        let _guard = self.write_lock.lock().await;
        let mut tx = self.pool.begin().await?;

        let existing = sqlx::query_as::<_, ProviderRow>(&format!(
            "{SELECT_PROVIDER} WHERE email = ?"
        ))
        .bind(email)
        .fetch_optional(&mut *tx)
        .await?;

        let provider = if let Some(row) = existing {
            let mut provider = Provider::from(row);
            provider.merge(fields);

            sqlx::query(
                r"
                UPDATE providers
                SET name = ?, experience = ?, location = ?, availability = ?,
                    specializations = ?, rate_expectations = ?, certifications = ?
                WHERE email = ?
                ",
            )
            .bind(&provider.name)
            .bind(&provider.experience)
            .bind(&provider.location)
            .bind(&provider.availability)
            .bind(&provider.specializations)
            .bind(provider.rate_expectations)
            .bind(&provider.certifications)
            .bind(&provider.email)
            .execute(&mut *tx)
            .await
            .map_err(RepositoryError::from_write)?;

            provider
        } else {
            let provider = Provider::new(email.clone(), fields, Utc::now());

            sqlx::query(
                r"
                INSERT INTO providers (
                    email, name, experience, location, availability,
                    specializations, rate_expectations, certifications, created_at
                )
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                ",
            )
            .bind(&provider.email)
            .bind(&provider.name)
            .bind(&provider.experience)
            .bind(&provider.location)
            .bind(&provider.availability)
            .bind(&provider.specializations)
            .bind(provider.rate_expectations)
            .bind(&provider.certifications)
            .bind(provider.created_at)
            .execute(&mut *tx)
            .await
            .map_err(RepositoryError::from_write)?;

            provider
        };

        tx.commit().await?;
        Ok(provider)
    }

    /// Get a provider by email.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no provider has this email.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn get(&self, email: &Email) -> Result<Provider, RepositoryError> {
        self.find(email).await?.ok_or(RepositoryError::NotFound)
    }

    /// Look up a provider by email.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find(&self, email: &Email) -> Result<Option<Provider>, RepositoryError> {
        let row = sqlx::query_as::<_, ProviderRow>(&format!("{SELECT_PROVIDER} WHERE email = ?"))
            .bind(email)
            .fetch_optional(self.pool)
            .await?;

        Ok(row.map(Into::into))
    }

    /// List all providers, ordered by email.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Provider>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProviderRow>(&format!("{SELECT_PROVIDER} ORDER BY email"))
            .fetch_all(self.pool)
            .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Providers whose location contains `location` (case-insensitive,
    /// literal) and whose rate fits within `budget`, cheapest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn within_budget(
        &self,
        location: &str,
        budget: f64,
    ) -> Result<Vec<Provider>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProviderRow>(&format!(
            "{SELECT_PROVIDER}
             WHERE instr(lower(location), lower(?)) > 0
               AND rate_expectations <= ?
             ORDER BY rate_expectations ASC, email ASC"
        ))
        .bind(location)
        .bind(budget)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}
