use std::sync::Arc;

use convo_core::Services;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub services: Services,
    /// Signs session and email-verification tokens.
    pub jwt_secret: String,
}
