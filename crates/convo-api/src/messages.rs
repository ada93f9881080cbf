use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use convo_core::messages;
use convo_types::api::{Claims, CreateMessageRequest, MessageResponse};

use crate::error::ApiError;
use crate::state::AppState;

pub async fn list_thread_messages(
    State(state): State<AppState>,
    Path(thread_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<MessageResponse>>, ApiError> {
    let listed = messages::list_thread_messages(&state.services, thread_id, claims.sub).await?;
    Ok(Json(listed))
}

pub async fn create_thread_message(
    State(state): State<AppState>,
    Path(thread_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let message =
        messages::post_thread_message(&state.services, thread_id, claims.sub, req.body).await?;
    Ok((StatusCode::CREATED, Json(message)))
}

pub async fn delete_thread_message(
    State(state): State<AppState>,
    Path((thread_id, message_id)): Path<(Uuid, Uuid)>,
    Extension(claims): Extension<Claims>,
) -> Result<StatusCode, ApiError> {
    messages::delete_thread_message(&state.services, thread_id, message_id, claims.sub).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_event_messages(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<MessageResponse>>, ApiError> {
    let listed = messages::list_event_messages(&state.services, event_id, claims.sub).await?;
    Ok(Json(listed))
}

pub async fn create_event_message(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let message =
        messages::post_event_message(&state.services, event_id, claims.sub, req.body).await?;
    Ok((StatusCode::CREATED, Json(message)))
}

pub async fn delete_event_message(
    State(state): State<AppState>,
    Path((event_id, message_id)): Path<(Uuid, Uuid)>,
    Extension(claims): Extension<Claims>,
) -> Result<StatusCode, ApiError> {
    messages::delete_event_message(&state.services, event_id, message_id, claims.sub).await?;
    Ok(StatusCode::NO_CONTENT)
}
