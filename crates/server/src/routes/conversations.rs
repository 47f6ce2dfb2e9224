//! Conversation log read endpoint.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use serde::{Deserialize, Serialize};

use helper_core::ConversationRole;

use crate::error::AppError;
use crate::models::ConversationEntry;
use crate::state::AppState;

use super::parse_email;

/// Build the conversations router.
pub fn router() -> Router<AppState> {
    Router::new().route("/api/conversations/{email}", get(list_entries))
}

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    /// Most recent entries to return; all when absent.
    pub limit: Option<usize>,
}

/// One log entry as returned over HTTP.
#[derive(Debug, Serialize)]
pub struct EntryResponse {
    pub seq: i64,
    pub role: ConversationRole,
    pub content: String,
    pub recipient: String,
    pub created_at: String,
}

impl From<ConversationEntry> for EntryResponse {
    fn from(entry: ConversationEntry) -> Self {
        Self {
            seq: entry.seq,
            role: entry.role,
            content: entry.content,
            recipient: entry.recipient,
            created_at: entry.created_at.to_rfc3339(),
        }
    }
}

/// Chronological log for one participant.
///
/// GET /api/conversations/{email}?limit=n
async fn list_entries(
    State(state): State<AppState>,
    Path(email): Path<String>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<Vec<EntryResponse>>, AppError> {
    let email = parse_email(&email)?;
    let entries = state.store().conversations().load(&email, params.limit).await?;

    Ok(Json(entries.into_iter().map(Into::into).collect()))
}
