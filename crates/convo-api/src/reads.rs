use axum::{
    Extension, Json,
    extract::{Path, State},
};
use uuid::Uuid;

use convo_core::reads;
use convo_types::api::{Claims, EventResponse, ThreadResponse};

use crate::error::ApiError;
use crate::state::AppState;

pub async fn mark_thread_read(
    State(state): State<AppState>,
    Path(thread_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<ThreadResponse>, ApiError> {
    let thread = reads::mark_thread_read(&state.services, thread_id, claims.sub).await?;
    Ok(Json(thread))
}

pub async fn mark_event_read(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<EventResponse>, ApiError> {
    let event = reads::mark_event_read(&state.services, event_id, claims.sub).await?;
    Ok(Json(event))
}
