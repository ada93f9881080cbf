use std::sync::Arc;

use tracing::error;

use convo_db::Database;

use crate::clients::{MailClient, NotificationClient, SearchClient};
use crate::error::CoreError;

/// Handles every core operation needs. Passed explicitly into each call;
/// there is no process-wide client.
///
/// `Clone` is cheap, all fields are `Arc`s.
#[derive(Clone)]
pub struct Services {
    pub db: Arc<Database>,
    pub mail: Arc<dyn MailClient>,
    pub search: Arc<dyn SearchClient>,
    pub notifications: Arc<dyn NotificationClient>,
}

impl Services {
    /// Run blocking store work off the async runtime.
    pub async fn blocking<F, T>(&self, f: F) -> Result<T, CoreError>
    where
        F: FnOnce(&Database) -> Result<T, CoreError> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || f(&db))
            .await
            .map_err(|e| {
                error!("spawn_blocking join error: {}", e);
                CoreError::Store(anyhow::anyhow!("blocking task failed: {}", e))
            })?
    }
}
