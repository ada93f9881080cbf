//! HTTP surface for Convo: message, read-marking, verification and task
//! endpoints on top of `convo-core`.

pub mod error;
pub mod messages;
pub mod middleware;
pub mod reads;
pub mod state;
pub mod tasks;
pub mod users;

use axum::{
    Router, middleware as axum_middleware,
    routing::{delete, get, post},
};

pub use state::{AppState, AppStateInner};

/// Every route the API serves. Layers such as tracing and CORS are added by
/// the binary.
pub fn router(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route(
            "/threads/{thread_id}/messages",
            get(messages::list_thread_messages).post(messages::create_thread_message),
        )
        .route(
            "/threads/{thread_id}/messages/{message_id}",
            delete(messages::delete_thread_message),
        )
        .route("/threads/{thread_id}/reads", post(reads::mark_thread_read))
        .route(
            "/events/{event_id}/messages",
            get(messages::list_event_messages).post(messages::create_event_message),
        )
        .route(
            "/events/{event_id}/messages/{message_id}",
            delete(messages::delete_event_message),
        )
        .route("/events/{event_id}/reads", post(reads::mark_event_read))
        .route("/users/me", get(users::me))
        .route("/users/verify", post(users::verify))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    let task_routes = Router::new().route("/tasks/digest", post(tasks::run_digest));

    Router::new()
        .merge(protected_routes)
        .merge(task_routes)
        .with_state(state)
}

#[cfg(test)]
mod testing;
