//! Integration tests for the care matching helper.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p helper-integration-tests
//! ```
//!
//! Every test opens its own in-memory `SQLite` store, so tests run in
//! parallel without shared state.
//!
//! # Test Categories
//!
//! - `store` - Profile merges, skills, matches, conversation log
//! - `matching` - Location and budget matching
//! - `query` - Dynamic query whitelist and filters
//! - `conversation` - Full turns against the scripted model
//! - `openai_client` - HTTP client behaviour against a mock server
//! - `http` - Axum routes

use std::sync::Arc;

use helper_core::Email;
use helper_server::db::Store;
use helper_server::llm::MockModel;
use helper_server::models::{Provider, ProviderFields, Seeker, SeekerFields};
use helper_server::services::{ChatSettings, ConversationService};
use helper_server::state::AppState;

/// Parse an email, panicking on bad test data.
///
/// # Panics
///
/// Panics if `raw` is not a valid email.
#[must_use]
#[allow(clippy::unwrap_used)]
pub fn email(raw: &str) -> Email {
    Email::parse(raw).unwrap()
}

/// A fresh store plus a scripted model.
pub struct TestContext {
    pub store: Store,
    pub model: Arc<MockModel>,
}

impl TestContext {
    /// Open an in-memory store with a default mock model.
    ///
    /// # Panics
    ///
    /// Panics if the in-memory database cannot be created.
    #[allow(clippy::unwrap_used)]
    pub async fn new() -> Self {
        Self::with_model(MockModel::default()).await
    }

    /// Open an in-memory store driven by `model`.
    ///
    /// # Panics
    ///
    /// Panics if the in-memory database cannot be created.
    #[allow(clippy::unwrap_used)]
    pub async fn with_model(model: MockModel) -> Self {
        Self {
            store: Store::in_memory().await.unwrap(),
            model: Arc::new(model),
        }
    }

    /// Conversation service over this context.
    #[must_use]
    pub fn conversations(&self) -> ConversationService<'_> {
        ConversationService::new(&self.store, self.model.as_ref(), ChatSettings::default())
    }

    /// Axum state sharing this context's store and model.
    #[must_use]
    pub fn app_state(&self) -> AppState {
        AppState::new(self.store.clone(), self.model.clone(), ChatSettings::default())
    }

    /// Store a provider with a location and hourly rate.
    ///
    /// # Panics
    ///
    /// Panics if the write fails.
    #[allow(clippy::unwrap_used)]
    pub async fn provider(&self, address: &str, location: &str, rate: f64) -> Provider {
        self.store
            .providers()
            .upsert(
                &email(address),
                &ProviderFields {
                    location: location.to_string(),
                    rate_expectations: rate,
                    ..Default::default()
                },
            )
            .await
            .unwrap()
    }

    /// Store a complete seeker with a location and hourly budget.
    ///
    /// # Panics
    ///
    /// Panics if the write fails.
    #[allow(clippy::unwrap_used)]
    pub async fn seeker(&self, address: &str, location: &str, budget: f64) -> Seeker {
        self.store
            .seekers()
            .upsert(
                &email(address),
                &SeekerFields {
                    care_needs: "companionship".to_string(),
                    location: location.to_string(),
                    schedule_requirements: "weekday mornings".to_string(),
                    budget,
                    ..Default::default()
                },
            )
            .await
            .unwrap()
    }
}
