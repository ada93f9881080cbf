use anyhow::Result;
use rusqlite::Transaction;
use uuid::Uuid;

use convo_types::{Event, Message, Thread, User};

use crate::queries;

/// A single SQLite transaction handed to multi-entity operations. Reads see
/// the transaction's own writes. Nothing is visible to other readers until
/// [`UnitOfWork::commit`]; dropping without committing rolls back.
pub struct UnitOfWork<'conn> {
    tx: Transaction<'conn>,
}

impl<'conn> UnitOfWork<'conn> {
    pub(crate) fn new(tx: Transaction<'conn>) -> Self {
        Self { tx }
    }

    pub fn commit(self) -> Result<()> {
        self.tx.commit()?;
        Ok(())
    }

    // -- Users --

    pub fn get_user(&self, id: Uuid) -> Result<Option<User>> {
        queries::get_user(&self.tx, id)
    }

    pub fn get_users(&self, ids: &[Uuid]) -> Result<Vec<User>> {
        queries::get_users(&self.tx, ids)
    }

    pub fn users_with_contact(&self, contact_id: Uuid) -> Result<Vec<User>> {
        queries::users_with_contact(&self.tx, contact_id)
    }

    pub fn put_user(&self, user: &User) -> Result<()> {
        queries::put_user(&self.tx, user)
    }

    pub fn put_users(&self, users: &[User]) -> Result<()> {
        users.iter().try_for_each(|u| queries::put_user(&self.tx, u))
    }

    pub fn delete_user(&self, id: Uuid) -> Result<()> {
        queries::delete_user(&self.tx, id)
    }

    // -- Threads --

    pub fn get_thread(&self, id: Uuid) -> Result<Option<Thread>> {
        queries::get_thread(&self.tx, id)
    }

    pub fn threads_by_user(&self, user_id: Uuid) -> Result<Vec<Thread>> {
        queries::threads_by_user(&self.tx, user_id)
    }

    pub fn put_thread(&self, thread: &Thread) -> Result<()> {
        queries::put_thread(&self.tx, thread)
    }

    pub fn put_threads(&self, threads: &[Thread]) -> Result<()> {
        threads.iter().try_for_each(|t| queries::put_thread(&self.tx, t))
    }

    // -- Events --

    pub fn get_event(&self, id: Uuid) -> Result<Option<Event>> {
        queries::get_event(&self.tx, id)
    }

    pub fn events_by_user(&self, user_id: Uuid) -> Result<Vec<Event>> {
        queries::events_by_user(&self.tx, user_id)
    }

    pub fn put_event(&self, event: &Event) -> Result<()> {
        queries::put_event(&self.tx, event)
    }

    pub fn put_events(&self, events: &[Event]) -> Result<()> {
        events.iter().try_for_each(|e| queries::put_event(&self.tx, e))
    }

    // -- Messages --

    pub fn get_message(&self, id: Uuid) -> Result<Option<Message>> {
        queries::get_message(&self.tx, id)
    }

    pub fn messages_by_parent(&self, parent_id: Uuid) -> Result<Vec<Message>> {
        queries::messages_by_parent(&self.tx, parent_id)
    }

    pub fn messages_by_user(&self, user_id: Uuid) -> Result<Vec<Message>> {
        queries::messages_by_user(&self.tx, user_id)
    }

    pub fn put_message(&self, message: &Message) -> Result<()> {
        queries::put_message(&self.tx, message)
    }

    pub fn put_messages(&self, messages: &[Message]) -> Result<()> {
        messages.iter().try_for_each(|m| queries::put_message(&self.tx, m))
    }

    pub fn delete_message(&self, id: Uuid) -> Result<()> {
        queries::delete_message(&self.tx, id)
    }
}
