//! Match lookup endpoints.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};

use crate::error::AppError;
use crate::models::{Provider, Seeker};
use crate::services::MatchingService;
use crate::state::AppState;

use super::parse_email;

/// Build the matches router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/matches/providers/{seeker_email}", get(providers_for))
        .route("/api/matches/seekers/{provider_email}", get(seekers_for))
}

/// Caregivers suiting a patient, cheapest first.
///
/// GET /api/matches/providers/{seeker_email}
async fn providers_for(
    State(state): State<AppState>,
    Path(seeker_email): Path<String>,
) -> Result<Json<Vec<Provider>>, AppError> {
    let seeker = parse_email(&seeker_email)?;
    let providers = MatchingService::new(state.store())
        .find_matching_providers(&seeker)
        .await?;

    Ok(Json(providers))
}

/// Patients suiting a caregiver, highest budget first.
///
/// GET /api/matches/seekers/{provider_email}
async fn seekers_for(
    State(state): State<AppState>,
    Path(provider_email): Path<String>,
) -> Result<Json<Vec<Seeker>>, AppError> {
    let provider = parse_email(&provider_email)?;
    let seekers = MatchingService::new(state.store())
        .find_matching_seekers(&provider)
        .await?;

    Ok(Json(seekers))
}
