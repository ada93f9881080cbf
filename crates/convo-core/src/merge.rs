//! Folding one account into another.
//!
//! The superseded user's contacts, messages, threads and events are
//! reassigned to the survivor inside a single store transaction, the
//! survivor inherits any profile fields it lacks, and the superseded row is
//! deleted. The search index is brought in line after the commit; index
//! failures are logged and never undo the merge.

use anyhow::Result;
use tracing::{error, info};
use uuid::Uuid;

use convo_db::{Database, UnitOfWork};
use convo_types::User;
use convo_types::keys::{merge_keys, swap_keys};
use convo_types::read::swap_read_users;

use crate::clients::{index_user, unindex_user};
use crate::context::Services;
use crate::error::CoreError;

/// Merge `superseded` into `survivor` and return the updated survivor.
///
/// Both users must already be stored. On a store failure nothing is
/// reassigned and the survivor's search document is refreshed from its
/// pre-merge state.
pub async fn merge_users(
    services: &Services,
    survivor: User,
    superseded: User,
) -> Result<User, CoreError> {
    let (survivor_id, superseded_id) = match (survivor.id, superseded.id) {
        (Some(a), Some(b)) if a != b => (a, b),
        (Some(_), Some(_)) => {
            return Err(CoreError::InvalidState("cannot merge a user into itself".into()));
        }
        _ => return Err(CoreError::InvalidState("merge requires two stored users".into())),
    };

    let original = survivor.clone();
    let superseded_registered = superseded.is_registered();

    let result = services
        .blocking(move |db| {
            merge_in_store(db, survivor, &superseded).map_err(CoreError::Transaction)
        })
        .await;

    match result {
        Ok(merged) => {
            info!(survivor = %survivor_id, superseded = %superseded_id, "users merged");
            if superseded_registered {
                unindex_user(services.search.as_ref(), superseded_id).await;
            }
            index_user(services.search.as_ref(), &merged).await;
            Ok(merged)
        }
        Err(e) => {
            error!(survivor = %survivor_id, superseded = %superseded_id, "merge failed: {}", e);
            index_user(services.search.as_ref(), &original).await;
            Err(e)
        }
    }
}

fn merge_in_store(db: &Database, mut survivor: User, superseded: &User) -> Result<User> {
    let mut writer = db.writer()?;
    let uow = writer.begin()?;

    let (Some(new), Some(old)) = (survivor.id, superseded.id) else {
        anyhow::bail!("merge requires two stored users");
    };

    reassign_contacts(&uow, old, new)?;
    reassign_messages(&uow, old, new)?;
    reassign_threads(&uow, old, new)?;
    reassign_events(&uow, old, new)?;

    merge_profile(&mut survivor, superseded);
    uow.put_user(&survivor)?;
    uow.delete_user(old)?;
    uow.commit()?;

    Ok(survivor)
}

/// Everyone who listed `old` as a contact now lists `new`. The survivor's
/// own list is handled by [`merge_profile`].
fn reassign_contacts(uow: &UnitOfWork<'_>, old: Uuid, new: Uuid) -> Result<()> {
    let mut users = uow.users_with_contact(old)?;
    users.retain(|u| u.id != Some(new));
    for user in &mut users {
        user.contact_ids = swap_keys(&user.contact_ids, old, new);
    }
    uow.put_users(&users)
}

fn reassign_messages(uow: &UnitOfWork<'_>, old: Uuid, new: Uuid) -> Result<()> {
    let mut messages = uow.messages_by_user(old)?;
    for message in &mut messages {
        message.user_id = new;
        message.reads = swap_read_users(&message.reads, old, new);
    }
    uow.put_messages(&messages)
}

fn reassign_threads(uow: &UnitOfWork<'_>, old: Uuid, new: Uuid) -> Result<()> {
    let mut threads = uow.threads_by_user(old)?;
    for thread in &mut threads {
        thread.user_ids = swap_keys(&thread.user_ids, old, new);
        thread.reads = swap_read_users(&thread.reads, old, new);
        if thread.owner_id == old {
            thread.owner_id = new;
        }
    }
    uow.put_threads(&threads)
}

fn reassign_events(uow: &UnitOfWork<'_>, old: Uuid, new: Uuid) -> Result<()> {
    let mut events = uow.events_by_user(old)?;
    for event in &mut events {
        event.user_ids = swap_keys(&event.user_ids, old, new);
        event.rsvp_ids = swap_keys(&event.rsvp_ids, old, new);
        event.reads = swap_read_users(&event.reads, old, new);
        if event.owner_id == old {
            event.owner_id = new;
        }
    }
    uow.put_events(&events)
}

/// Survivor fields win and are left exactly as they are; empty ones are
/// filled from `superseded`. Emails and contacts are unioned, and neither
/// user is left as a contact of the survivor.
pub fn merge_profile(survivor: &mut User, superseded: &User) {
    if survivor.avatar.is_empty() {
        survivor.avatar = superseded.avatar.clone();
    }
    if survivor.first_name.is_empty() {
        survivor.first_name = superseded.first_name.clone();
    }
    if survivor.last_name.is_empty() {
        survivor.last_name = superseded.last_name.clone();
    }
    for email in &superseded.emails {
        survivor.add_email(email);
    }

    let excluded = [survivor.id, superseded.id];
    survivor.contact_ids = merge_keys(&survivor.contact_ids, &superseded.contact_ids)
        .into_iter()
        .filter(|id| !excluded.contains(&Some(*id)))
        .collect();

    survivor.derive_account_state();
}
