use axum::{Json, extract::State};
use convo_core::digest;
use convo_types::api::DigestSummary;

use crate::error::ApiError;
use crate::state::AppState;

/// Run the digest sweep now. Reachability is restricted by the deployment.
pub async fn run_digest(State(state): State<AppState>) -> Result<Json<DigestSummary>, ApiError> {
    let summary = digest::run_digest_for_all(&state.services).await?;
    Ok(Json(summary))
}
