//! Posting, listing and deleting messages inside threads and events.

use tracing::{debug, warn};
use uuid::Uuid;

use convo_db::Database;
use convo_types::api::MessageResponse;
use convo_types::read::{clear_reads, mark_as_read};
use convo_types::{Event, Message, Thread, UserPartial};

use crate::clients::Notification;
use crate::container::Container;
use crate::context::Services;
use crate::error::CoreError;

pub async fn post_thread_message(
    services: &Services,
    thread_id: Uuid,
    user_id: Uuid,
    body: String,
) -> Result<MessageResponse, CoreError> {
    post_message::<Thread>(services, thread_id, user_id, body).await
}

pub async fn post_event_message(
    services: &Services,
    event_id: Uuid,
    user_id: Uuid,
    body: String,
) -> Result<MessageResponse, CoreError> {
    post_message::<Event>(services, event_id, user_id, body).await
}

pub async fn list_thread_messages(
    services: &Services,
    thread_id: Uuid,
    user_id: Uuid,
) -> Result<Vec<MessageResponse>, CoreError> {
    services
        .blocking(move |db| list_messages::<Thread>(db, thread_id, user_id))
        .await
}

pub async fn list_event_messages(
    services: &Services,
    event_id: Uuid,
    user_id: Uuid,
) -> Result<Vec<MessageResponse>, CoreError> {
    services
        .blocking(move |db| list_messages::<Event>(db, event_id, user_id))
        .await
}

pub async fn delete_thread_message(
    services: &Services,
    thread_id: Uuid,
    message_id: Uuid,
    user_id: Uuid,
) -> Result<(), CoreError> {
    services
        .blocking(move |db| delete_message::<Thread>(db, thread_id, message_id, user_id))
        .await
}

pub async fn delete_event_message(
    services: &Services,
    event_id: Uuid,
    message_id: Uuid,
    user_id: Uuid,
) -> Result<(), CoreError> {
    services
        .blocking(move |db| delete_message::<Event>(db, event_id, message_id, user_id))
        .await
}

/// Remove one photo from the author's message. Missing keys are a no-op.
pub async fn delete_message_photo(
    services: &Services,
    message_id: Uuid,
    user_id: Uuid,
    key: String,
) -> Result<Message, CoreError> {
    services
        .blocking(move |db| {
            let mut message = db
                .get_message(message_id)?
                .ok_or(CoreError::NotFound("message"))?;
            if !message.owner_is(user_id) {
                return Err(CoreError::Forbidden);
            }
            if message.delete_photo(&key) {
                db.put_message(&message)?;
            }
            Ok(message)
        })
        .await
}

async fn post_message<C: Container>(
    services: &Services,
    container_id: Uuid,
    user_id: Uuid,
    body: String,
) -> Result<MessageResponse, CoreError> {
    let body = body.trim().to_string();
    if body.is_empty() {
        return Err(CoreError::BadRequest("Message body cannot be empty".into()));
    }

    let (message, author, notification) = services
        .blocking(move |db| store_new_message::<C>(db, container_id, user_id, &body))
        .await?;

    if !notification.user_ids.is_empty() {
        if let Err(e) = services.notifications.notify(&notification).await {
            warn!(
                target_id = %notification.target_id,
                "Failed to send message notification: {:#}", e
            );
        }
    }

    Ok(MessageResponse {
        message,
        user: Some(author),
    })
}

fn store_new_message<C: Container>(
    db: &Database,
    container_id: Uuid,
    user_id: Uuid,
    body: &str,
) -> Result<(Message, UserPartial, Notification), CoreError> {
    let mut writer = db.writer()?;
    let uow = writer.begin()?;

    let mut container = C::load(&uow, container_id)?.ok_or(CoreError::NotFound(C::KIND))?;
    if !container.can_access(user_id) {
        return Err(CoreError::Forbidden);
    }
    let author = uow.get_user(user_id)?.ok_or(CoreError::NotFound("user"))?;

    let mut message = Message::new(user_id, container_id, body);
    mark_as_read(&mut message, user_id);

    clear_reads(&mut container);
    mark_as_read(&mut container, user_id);
    container.message_posted();

    uow.put_message(&message)?;
    container.save(&uow)?;
    uow.commit()?;

    debug!(kind = C::KIND, container_id = %container_id, message_id = %message.id, "message posted");

    let notification = Notification {
        user_ids: container
            .participant_ids()
            .into_iter()
            .filter(|&id| id != user_id)
            .collect(),
        actor: author.full_name.clone(),
        verb: "posted",
        target: C::KIND,
        target_id: container_id,
        target_name: container.title().to_string(),
    };

    Ok((message, UserPartial::from(&author), notification))
}

fn list_messages<C: Container>(
    db: &Database,
    container_id: Uuid,
    user_id: Uuid,
) -> Result<Vec<MessageResponse>, CoreError> {
    let container = C::find(db, container_id)?.ok_or(CoreError::NotFound(C::KIND))?;
    if !container.can_access(user_id) {
        return Err(CoreError::Forbidden);
    }

    let messages = db.messages_by_parent(container_id)?;
    let mut author_ids: Vec<Uuid> = messages.iter().map(|m| m.user_id).collect();
    author_ids.sort_unstable();
    author_ids.dedup();
    let authors = db.get_users(&author_ids)?;

    Ok(messages
        .into_iter()
        .map(|message| {
            let user = authors
                .iter()
                .find(|u| u.id == Some(message.user_id))
                .map(UserPartial::from);
            MessageResponse { message, user }
        })
        .collect())
}

fn delete_message<C: Container>(
    db: &Database,
    container_id: Uuid,
    message_id: Uuid,
    user_id: Uuid,
) -> Result<(), CoreError> {
    let mut writer = db.writer()?;
    let uow = writer.begin()?;

    let mut container = C::load(&uow, container_id)?.ok_or(CoreError::NotFound(C::KIND))?;
    let messages = uow.messages_by_parent(container_id)?;
    let position = messages
        .iter()
        .position(|m| m.id == message_id)
        .ok_or(CoreError::NotFound("message"))?;

    if !messages[position].owner_is(user_id) {
        return Err(CoreError::Forbidden);
    }
    if C::HEAD_IS_PROTECTED && position == 0 {
        return Err(CoreError::BadRequest("You cannot delete this message".into()));
    }

    uow.delete_message(message_id)?;
    container.message_deleted();
    container.save(&uow)?;
    uow.commit()?;

    debug!(kind = C::KIND, container_id = %container_id, message_id = %message_id, "message deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Harness, id};
    use chrono::{Duration, Utc};
    use convo_types::read::is_read;

    #[tokio::test]
    async fn posting_leaves_only_the_posters_marker() {
        let h = Harness::new();
        let ada = h.user("Ada");
        let grace = h.user("Grace");
        let mut thread = Thread::new("plans", &ada, &[grace.clone()]).unwrap();
        mark_as_read(&mut thread, id(&ada));
        mark_as_read(&mut thread, id(&grace));
        h.db().put_thread(&thread).unwrap();

        let response = post_thread_message(&h.services, thread.id, id(&grace), "hello".into())
            .await
            .unwrap();

        let stored = h.db().get_thread(thread.id).unwrap().unwrap();
        assert_eq!(stored.reads.len(), 1);
        assert!(is_read(&stored, id(&grace)));
        assert_eq!(stored.response_count, 1);
        assert_eq!(response.user.unwrap().first_name, "Grace");
        assert!(is_read(&response.message, id(&grace)));

        let sent = h.notifications.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].user_ids, vec![id(&ada)]);
        assert_eq!(sent[0].target, "thread");
    }

    #[tokio::test]
    async fn posting_requires_membership_and_a_body() {
        let h = Harness::new();
        let ada = h.user("Ada");
        let eve = h.user("Eve");
        let event = Event::new("party", "home", Utc::now() + Duration::days(1), &ada, &[]).unwrap();
        h.db().put_event(&event).unwrap();

        let err = post_event_message(&h.services, event.id, id(&eve), "hi".into())
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Forbidden));

        let err = post_event_message(&h.services, event.id, id(&ada), "   ".into())
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::BadRequest(_)));
        assert!(h.db().messages_by_parent(event.id).unwrap().is_empty());
    }

    #[tokio::test]
    async fn thread_head_cannot_be_deleted() {
        let h = Harness::new();
        let ada = h.user("Ada");
        let thread = Thread::new("t", &ada, &[]).unwrap();
        h.db().put_thread(&thread).unwrap();

        let head = post_thread_message(&h.services, thread.id, id(&ada), "first".into())
            .await
            .unwrap()
            .message;
        let reply = post_thread_message(&h.services, thread.id, id(&ada), "second".into())
            .await
            .unwrap()
            .message;

        let err = delete_thread_message(&h.services, thread.id, head.id, id(&ada))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::BadRequest(_)));

        delete_thread_message(&h.services, thread.id, reply.id, id(&ada))
            .await
            .unwrap();
        let stored = h.db().get_thread(thread.id).unwrap().unwrap();
        assert_eq!(stored.response_count, 1);
        assert_eq!(h.db().messages_by_parent(thread.id).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn only_the_author_deletes() {
        let h = Harness::new();
        let ada = h.user("Ada");
        let grace = h.user("Grace");
        let event = Event::new("e", "x", Utc::now(), &ada, &[grace.clone()]).unwrap();
        h.db().put_event(&event).unwrap();
        let message = Message::new(id(&ada), event.id, "mine");
        h.db().put_message(&message).unwrap();

        let err = delete_event_message(&h.services, event.id, message.id, id(&grace))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Forbidden));

        // Events have no protected head.
        delete_event_message(&h.services, event.id, message.id, id(&ada))
            .await
            .unwrap();
        assert!(h.db().get_message(message.id).unwrap().is_none());
    }

    #[tokio::test]
    async fn listing_attaches_authors() {
        let h = Harness::new();
        let ada = h.user("Ada");
        let grace = h.user("Grace");
        let thread = Thread::new("t", &ada, &[grace.clone()]).unwrap();
        h.db().put_thread(&thread).unwrap();
        let mut first = Message::new(id(&ada), thread.id, "one");
        first.timestamp = Utc::now() - Duration::minutes(5);
        h.db().put_message(&first).unwrap();
        h.db().put_message(&Message::new(id(&grace), thread.id, "two")).unwrap();

        let listed = list_thread_messages(&h.services, thread.id, id(&grace)).await.unwrap();

        let names: Vec<_> = listed
            .iter()
            .map(|m| m.user.as_ref().unwrap().first_name.as_str())
            .collect();
        assert_eq!(names, ["Ada", "Grace"]);
    }

    #[tokio::test]
    async fn photo_removal_is_idempotent() {
        let h = Harness::new();
        let ada = h.user("Ada");
        let mut message = Message::new(id(&ada), Uuid::new_v4(), "pic");
        message.photo_keys = vec!["a.jpg".into(), "b.jpg".into()];
        h.db().put_message(&message).unwrap();

        delete_message_photo(&h.services, message.id, id(&ada), "a.jpg".into())
            .await
            .unwrap();
        let again = delete_message_photo(&h.services, message.id, id(&ada), "a.jpg".into())
            .await
            .unwrap();

        assert_eq!(again.photo_keys, vec!["b.jpg".to_string()]);
    }
}
