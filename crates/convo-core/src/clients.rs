//! Outbound collaborators. The core calls these and never implements the
//! real transports; the server wires concrete clients in.

use anyhow::Result;
use futures_util::future::BoxFuture;
use tracing::{info, warn};
use uuid::Uuid;

use convo_types::{Event, User, UserPartial};

use crate::digest::DigestItem;

/// Sends the periodic digest email.
pub trait MailClient: Send + Sync {
    fn send_digest<'a>(
        &'a self,
        items: &'a [DigestItem],
        upcoming: &'a [Event],
        user: &'a User,
    ) -> BoxFuture<'a, Result<()>>;
}

/// User search index. Every call is best-effort: callers log failures and
/// carry on.
pub trait SearchClient: Send + Sync {
    fn update<'a>(&'a self, user: &'a UserPartial) -> BoxFuture<'a, Result<()>>;
    fn delete(&self, user_id: Uuid) -> BoxFuture<'_, Result<()>>;
}

/// Realtime notification fan-out and per-user token issuance.
pub trait NotificationClient: Send + Sync {
    fn generate_token(&self, user_id: Uuid) -> String;
    fn notify<'a>(&'a self, notification: &'a Notification) -> BoxFuture<'a, Result<()>>;
}

/// "`actor` `verb` in `target_name`", addressed to `user_ids`.
#[derive(Debug, Clone)]
pub struct Notification {
    pub user_ids: Vec<Uuid>,
    pub actor: String,
    pub verb: &'static str,
    pub target: &'static str,
    pub target_id: Uuid,
    pub target_name: String,
}

/// Upsert a registered user into the search index, logging failures.
pub async fn index_user(search: &dyn SearchClient, user: &User) {
    if !user.is_registered() {
        return;
    }
    if let Err(e) = search.update(&UserPartial::from(user)).await {
        warn!(user_id = ?user.id, "Failed to index user: {:#}", e);
    }
}

/// Remove a user from the search index, logging failures.
pub async fn unindex_user(search: &dyn SearchClient, user_id: Uuid) {
    if let Err(e) = search.delete(user_id).await {
        warn!(user_id = %user_id, "Failed to remove user from search index: {:#}", e);
    }
}

/// Mailer that only writes the digest summary to the log.
pub struct TracingMail;

impl MailClient for TracingMail {
    fn send_digest<'a>(
        &'a self,
        items: &'a [DigestItem],
        upcoming: &'a [Event],
        user: &'a User,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let messages: usize = items.iter().map(|i| i.messages.len()).sum();
            info!(
                to = %user.email,
                items = items.len(),
                messages,
                upcoming = upcoming.len(),
                "digest"
            );
            Ok(())
        })
    }
}

/// Search client for deployments without an index.
pub struct NullSearch;

impl SearchClient for NullSearch {
    fn update<'a>(&'a self, _user: &'a UserPartial) -> BoxFuture<'a, Result<()>> {
        Box::pin(async { Ok(()) })
    }

    fn delete(&self, _user_id: Uuid) -> BoxFuture<'_, Result<()>> {
        Box::pin(async { Ok(()) })
    }
}
