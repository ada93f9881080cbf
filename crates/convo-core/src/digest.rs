//! Daily digest of unread messages.
//!
//! A run for one user has three phases:
//!
//! 1. plan: load the user's threads and events, collect upcoming events,
//!    and build one [`DigestItem`] per container that still has unread
//!    messages for the user;
//! 2. deliver: hand the plan to the [`MailClient`](crate::MailClient);
//! 3. mark: record every delivered message as read and write them back in
//!    one batch.
//!
//! Delivery failure stops the run before anything is marked, so the next
//! run sends the same items again. A failed mark after a successful send
//! means the same messages go out twice; duplicates are preferred over
//! lost read markers.
//!
//! Runs for the same user must not overlap. Nothing here serialises them;
//! [`run_digest_for_all`] processes users one at a time.

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use convo_db::Database;
use convo_types::api::DigestSummary;
use convo_types::read::{is_read, mark_as_read};
use convo_types::{Event, Message, Thread, User};

use crate::context::Services;
use crate::error::CoreError;

/// A container whose unread messages can be summarised.
pub trait Digestable {
    fn key(&self) -> Uuid;
    fn name(&self) -> &str;
    fn messages(&self, db: &Database) -> anyhow::Result<Vec<Message>>;
}

impl Digestable for Thread {
    fn key(&self) -> Uuid {
        self.id
    }

    fn name(&self) -> &str {
        &self.subject
    }

    fn messages(&self, db: &Database) -> anyhow::Result<Vec<Message>> {
        db.messages_by_parent(self.id)
    }
}

impl Digestable for Event {
    fn key(&self) -> Uuid {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn messages(&self, db: &Database) -> anyhow::Result<Vec<Message>> {
        db.messages_by_parent(self.id)
    }
}

/// Unread messages of one container. Never built with an empty list.
#[derive(Debug, Clone, Serialize)]
pub struct DigestItem {
    pub parent_id: Uuid,
    pub name: String,
    pub messages: Vec<Message>,
}

/// What a run would send.
#[derive(Debug, Default)]
pub struct DigestPlan {
    pub items: Vec<DigestItem>,
    pub upcoming: Vec<Event>,
}

impl DigestPlan {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty() && self.upcoming.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestOutcome {
    /// Nothing unread and nothing upcoming; no mail sent.
    Skipped,
    Sent { items: usize, messages: usize },
}

/// Build the digest for `user_id` as of `now` without side effects.
///
/// Events come before threads. Any store error aborts the whole plan
/// rather than skipping the failing container.
pub fn plan_digest(db: &Database, user_id: Uuid, now: DateTime<Utc>) -> Result<DigestPlan, CoreError> {
    let events = db.events_by_user(user_id)?;
    let threads = db.threads_by_user(user_id)?;

    let mut candidates: Vec<&dyn Digestable> = Vec::new();
    let mut upcoming = Vec::new();

    for event in &events {
        if !is_read(event, user_id) {
            candidates.push(event);
        }
        // Upcoming events go out as reminders whether read or not.
        if event.is_upcoming(now) {
            upcoming.push(event.clone());
        }
    }

    for thread in &threads {
        if !is_read(thread, user_id) {
            candidates.push(thread);
        }
    }

    let items = generate_digest_list(db, user_id, &candidates)?;

    Ok(DigestPlan { items, upcoming })
}

fn generate_digest_list(
    db: &Database,
    user_id: Uuid,
    candidates: &[&dyn Digestable],
) -> Result<Vec<DigestItem>, CoreError> {
    let mut items = Vec::new();
    for candidate in candidates {
        let item = generate_digest_item(db, user_id, *candidate)
            .with_context(|| format!("generate digest list for user {}", user_id))?;
        if let Some(item) = item {
            items.push(item);
        }
    }
    Ok(items)
}

/// `Ok(None)` when the container has nothing unread for the user.
fn generate_digest_item(
    db: &Database,
    user_id: Uuid,
    d: &dyn Digestable,
) -> anyhow::Result<Option<DigestItem>> {
    let messages = d
        .messages(db)
        .with_context(|| format!("load messages of {}", d.key()))?;

    let unread: Vec<Message> = messages
        .into_iter()
        .filter(|m| !is_read(m, user_id))
        .collect();

    if unread.is_empty() {
        return Ok(None);
    }

    Ok(Some(DigestItem {
        parent_id: d.key(),
        name: d.name().to_string(),
        messages: unread,
    }))
}

/// Mark every message in `items` as read by `user_id` in one transaction.
/// Messages are re-read first so writes made during delivery survive;
/// messages deleted in the meantime are skipped. Returns the number of
/// messages written.
pub fn mark_digested_messages_as_read(
    db: &Database,
    user_id: Uuid,
    items: &[DigestItem],
) -> Result<usize, CoreError> {
    let mut writer = db.writer()?;
    let uow = writer.begin()?;

    let mut messages = Vec::new();
    for message_id in items.iter().flat_map(|i| i.messages.iter().map(|m| m.id)) {
        let Some(mut message) = uow.get_message(message_id)? else {
            debug!(message_id = %message_id, "Digested message is gone, skipping");
            continue;
        };
        mark_as_read(&mut message, user_id);
        messages.push(message);
    }

    uow.put_messages(&messages)?;
    uow.commit()?;
    Ok(messages.len())
}

/// Plan, deliver and mark one user's digest.
pub async fn run_digest_for_user(services: &Services, user: &User) -> Result<DigestOutcome, CoreError> {
    let user_id = user
        .id
        .ok_or_else(|| CoreError::InvalidState("digest requested for an unsaved user".into()))?;

    let plan = services
        .blocking(move |db| plan_digest(db, user_id, Utc::now()))
        .await?;

    if plan.is_empty() {
        debug!(user_id = %user_id, "Nothing to digest");
        return Ok(DigestOutcome::Skipped);
    }

    let item_count = plan.items.len();

    services
        .mail
        .send_digest(&plan.items, &plan.upcoming, user)
        .await
        .map_err(|e| {
            warn!(user_id = %user_id, "Digest delivery failed: {:#}", e);
            CoreError::Delivery(e)
        })?;

    let items = plan.items;
    let marked = services
        .blocking(move |db| mark_digested_messages_as_read(db, user_id, &items))
        .await
        .inspect_err(|e| {
            error!(user_id = %user_id, "Digest sent but read markers not saved: {}", e);
        })?;

    info!(user_id = %user_id, items = item_count, messages = marked, "Digest sent");
    Ok(DigestOutcome::Sent {
        items: item_count,
        messages: marked,
    })
}

/// Run the digest for every stored user, one after another. A failing user
/// is logged and counted; the sweep continues.
pub async fn run_digest_for_all(services: &Services) -> Result<DigestSummary, CoreError> {
    let user_ids = services.blocking(|db| Ok(db.all_user_ids()?)).await?;
    let mut summary = DigestSummary::default();

    for user_id in user_ids {
        let user = services.blocking(move |db| Ok(db.get_user(user_id)?)).await;

        let result = match user {
            // Deleted by a merge since the id list was read.
            Ok(None) => {
                summary.skipped += 1;
                continue;
            }
            Ok(Some(user)) => run_digest_for_user(services, &user).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(DigestOutcome::Sent { .. }) => summary.sent += 1,
            Ok(DigestOutcome::Skipped) => summary.skipped += 1,
            Err(e) => {
                error!(user_id = %user_id, "Digest failed: {}", e);
                summary.failed += 1;
            }
        }
    }

    info!(
        sent = summary.sent,
        skipped = summary.skipped,
        failed = summary.failed,
        "Digest sweep complete"
    );
    Ok(summary)
}
