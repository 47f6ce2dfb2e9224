//! Provider/seeker matching.
//!
//! A provider suits a seeker when the provider's location contains the
//! seeker's (case-insensitive, literal substring) and the provider's rate is
//! within the seeker's budget. The seeker-side search mirrors this.

use tracing::instrument;

use helper_core::Email;

use crate::db::{RepositoryError, Store};
use crate::models::{Provider, Seeker};

/// One seeker and the providers that suit them.
#[derive(Debug, Clone)]
pub struct SeekerMatches {
    pub seeker: Seeker,
    pub providers: Vec<Provider>,
}

/// One provider and the seekers they suit.
#[derive(Debug, Clone)]
pub struct ProviderMatches {
    pub provider: Provider,
    pub seekers: Vec<Seeker>,
}

/// Matches in both directions for every stored profile.
#[derive(Debug, Clone, Default)]
pub struct MatchReport {
    pub seekers: Vec<SeekerMatches>,
    pub providers: Vec<ProviderMatches>,
}

/// Matching over the entity store.
pub struct MatchingService<'a> {
    store: &'a Store,
}

impl<'a> MatchingService<'a> {
    #[must_use]
    pub const fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// Providers suitable for a seeker, cheapest first.
    ///
    /// An empty result is not an error.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the seeker has no profile.
    #[instrument(skip(self), fields(seeker = %seeker_email))]
    pub async fn find_matching_providers(
        &self,
        seeker_email: &Email,
    ) -> Result<Vec<Provider>, RepositoryError> {
        let seeker = self.store.seekers().get(seeker_email).await?;
        self.providers_for(&seeker).await
    }

    /// Seekers suitable for a provider, highest budget first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the provider has no profile.
    #[instrument(skip(self), fields(provider = %provider_email))]
    pub async fn find_matching_seekers(
        &self,
        provider_email: &Email,
    ) -> Result<Vec<Seeker>, RepositoryError> {
        let provider = self.store.providers().get(provider_email).await?;
        self.seekers_for(&provider).await
    }

    /// Run matching for every seeker and every provider.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if a query fails.
    #[instrument(skip(self))]
    pub async fn match_report(&self) -> Result<MatchReport, RepositoryError> {
        let mut report = MatchReport::default();

        for seeker in self.store.seekers().list().await? {
            let providers = self.providers_for(&seeker).await?;
            report.seekers.push(SeekerMatches { seeker, providers });
        }

        for provider in self.store.providers().list().await? {
            let seekers = self.seekers_for(&provider).await?;
            report.providers.push(ProviderMatches { provider, seekers });
        }

        tracing::info!(
            seekers = report.seekers.len(),
            providers = report.providers.len(),
            "Built match report"
        );
        Ok(report)
    }

    async fn providers_for(&self, seeker: &Seeker) -> Result<Vec<Provider>, RepositoryError> {
        self.store
            .providers()
            .within_budget(&seeker.location, seeker.budget)
            .await
    }

    async fn seekers_for(&self, provider: &Provider) -> Result<Vec<Seeker>, RepositoryError> {
        self.store
            .seekers()
            .affording(&provider.location, provider.rate_expectations)
            .await
    }
}
