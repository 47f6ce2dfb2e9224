//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::SqlitePool;

use crate::db::Store;
use crate::llm::ChatModel;
use crate::services::{ChatSettings, ConversationService};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    store: Store,
    model: Arc<dyn ChatModel>,
    settings: ChatSettings,
}

impl AppState {
    /// Build state from a migrated store and a model backend.
    #[must_use]
    pub fn new(store: Store, model: Arc<dyn ChatModel>, settings: ChatSettings) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                store,
                model,
                settings,
            }),
        }
    }

    #[must_use]
    pub fn store(&self) -> &Store {
        &self.inner.store
    }

    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        self.inner.store.pool()
    }

    #[must_use]
    pub fn model(&self) -> &dyn ChatModel {
        self.inner.model.as_ref()
    }

    #[must_use]
    pub fn settings(&self) -> ChatSettings {
        self.inner.settings
    }

    /// Conversation service bound to this state.
    #[must_use]
    pub fn conversations(&self) -> ConversationService<'_> {
        ConversationService::new(self.store(), self.model(), self.settings())
    }
}
