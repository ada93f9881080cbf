//! Marking a whole thread or event as read for one user.

use uuid::Uuid;

use convo_db::Database;
use convo_types::api::{EventResponse, ThreadResponse};
use convo_types::models::map_reads_to_user_partials;
use convo_types::read::mark_as_read;
use convo_types::{Event, Thread, UserPartial};

use crate::container::Container;
use crate::context::Services;
use crate::error::CoreError;

pub async fn mark_thread_read(
    services: &Services,
    thread_id: Uuid,
    user_id: Uuid,
) -> Result<ThreadResponse, CoreError> {
    let (thread, reads) = services
        .blocking(move |db| mark_container_read::<Thread>(db, thread_id, user_id))
        .await?;
    Ok(ThreadResponse { thread, reads })
}

pub async fn mark_event_read(
    services: &Services,
    event_id: Uuid,
    user_id: Uuid,
) -> Result<EventResponse, CoreError> {
    let (event, reads) = services
        .blocking(move |db| mark_container_read::<Event>(db, event_id, user_id))
        .await?;
    Ok(EventResponse { event, reads })
}

/// Mark every child message and then the container itself, all in one
/// transaction. Returns the container and its readers.
fn mark_container_read<C: Container>(
    db: &Database,
    container_id: Uuid,
    user_id: Uuid,
) -> Result<(C, Vec<UserPartial>), CoreError> {
    let mut writer = db.writer()?;
    let uow = writer.begin()?;

    let mut container = C::load(&uow, container_id)?.ok_or(CoreError::NotFound(C::KIND))?;
    if !container.can_access(user_id) {
        return Err(CoreError::Forbidden);
    }

    let mut messages = uow.messages_by_parent(container_id)?;
    for message in &mut messages {
        mark_as_read(message, user_id);
    }
    uow.put_messages(&messages)?;

    mark_as_read(&mut container, user_id);
    container.save(&uow)?;

    let participants = uow.get_users(&container.participant_ids())?;
    uow.commit()?;

    let reads = map_reads_to_user_partials(&container, &participants);
    Ok((container, reads))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Harness, id};
    use chrono::Utc;
    use convo_types::Message;
    use convo_types::read::is_read;

    #[tokio::test]
    async fn marks_messages_and_thread() {
        let h = Harness::new();
        let ada = h.user("Ada");
        let grace = h.user("Grace");
        let thread = Thread::new("t", &grace, &[ada.clone()]).unwrap();
        h.db().put_thread(&thread).unwrap();
        let message = Message::new(id(&grace), thread.id, "hi");
        h.db().put_message(&message).unwrap();

        let response = mark_thread_read(&h.services, thread.id, id(&ada)).await.unwrap();

        assert!(is_read(&response.thread, id(&ada)));
        assert_eq!(response.reads.len(), 1);
        assert_eq!(response.reads[0].first_name, "Ada");
        let stored = h.db().get_message(message.id).unwrap().unwrap();
        assert!(is_read(&stored, id(&ada)));
        let stored = h.db().get_thread(thread.id).unwrap().unwrap();
        assert!(is_read(&stored, id(&ada)));
    }

    #[tokio::test]
    async fn marking_twice_keeps_one_marker() {
        let h = Harness::new();
        let ada = h.user("Ada");
        let event = Event::new("e", "x", Utc::now(), &ada, &[]).unwrap();
        h.db().put_event(&event).unwrap();

        mark_event_read(&h.services, event.id, id(&ada)).await.unwrap();
        let response = mark_event_read(&h.services, event.id, id(&ada)).await.unwrap();

        assert_eq!(response.event.reads.len(), 1);
    }

    #[tokio::test]
    async fn outsiders_and_missing_containers_are_rejected() {
        let h = Harness::new();
        let ada = h.user("Ada");
        let eve = h.user("Eve");
        let thread = Thread::new("t", &ada, &[]).unwrap();
        h.db().put_thread(&thread).unwrap();

        let err = mark_thread_read(&h.services, thread.id, id(&eve)).await.unwrap_err();
        assert!(matches!(err, CoreError::Forbidden));

        let err = mark_thread_read(&h.services, Uuid::new_v4(), id(&ada)).await.unwrap_err();
        assert!(matches!(err, CoreError::NotFound("thread")));
    }
}
