//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                               - Liveness check
//! GET  /health/ready                         - Readiness check (database)
//!
//! POST /api/chat                             - Process one inbound message
//! GET  /api/conversations/{email}?limit=n    - Conversation log for a participant
//! GET  /api/matches/providers/{seeker_email} - Caregivers suiting a patient
//! GET  /api/matches/seekers/{provider_email} - Patients suiting a caregiver
//! ```

pub mod chat;
pub mod conversations;
pub mod matches;

use axum::{Router, extract::State, http::StatusCode, routing::get};

use helper_core::Email;

use crate::error::AppError;
use crate::state::AppState;

/// Build the application router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .merge(chat::router())
        .merge(conversations::router())
        .merge(matches::router())
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the database is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match sqlx::query("SELECT 1").fetch_one(state.pool()).await {
        Ok(_) => StatusCode::OK,
        Err(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

/// Parse an email taken from a path or body.
fn parse_email(raw: &str) -> Result<Email, AppError> {
    Email::parse(raw).map_err(|e| AppError::BadRequest(e.to_string()))
}
