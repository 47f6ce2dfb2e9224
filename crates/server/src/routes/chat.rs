//! Chat endpoint: one request per inbound participant message.

use axum::{Json, Router, extract::State, routing::post};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::services::Reply;
use crate::state::AppState;

use super::parse_email;

/// Build the chat router.
pub fn router() -> Router<AppState> {
    Router::new().route("/api/chat", post(send_message))
}

// =============================================================================
// Request/Response Types
// =============================================================================

/// Inbound message. `email` is optional; it may also appear in the text.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub email: Option<String>,
    pub message: String,
}

/// Outcome of a processed message.
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub stage: String,
    pub replies: Vec<Reply>,
}

// =============================================================================
// Route Handlers
// =============================================================================

/// Process one message and return the assistant replies.
///
/// POST /api/chat
async fn send_message(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    if request.message.trim().is_empty() {
        return Err(AppError::BadRequest("message is empty".to_string()));
    }

    let email = request
        .email
        .as_deref()
        .filter(|raw| !raw.trim().is_empty())
        .map(parse_email)
        .transpose()?;

    let outcome = state
        .conversations()
        .handle_turn(email, &request.message)
        .await?;

    Ok(Json(ChatResponse {
        email: outcome.email.map(|e| e.to_string()),
        stage: outcome.stage.to_string(),
        replies: outcome.replies,
    }))
}
