use anyhow::{Result, bail};
use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;
use uuid::Uuid;

use convo_types::{Event, Message, Thread, User};

use crate::Database;
use crate::rows::{
    EVENT_COLUMNS, MESSAGE_COLUMNS, THREAD_COLUMNS, USER_COLUMNS, event_from_row,
    message_from_row, thread_from_row, user_from_row,
};

impl Database {
    // -- Users --

    /// Insert or replace `user`, assigning a fresh id to incomplete users.
    pub fn put_user(&self, user: &mut User) -> Result<()> {
        if user.id.is_none() {
            user.id = Some(Uuid::new_v4());
        }
        user.derive_properties();
        self.with_conn(|conn| put_user(conn, user))
    }

    pub fn get_user(&self, id: Uuid) -> Result<Option<User>> {
        self.with_conn(|conn| get_user(conn, id))
    }

    pub fn get_users(&self, ids: &[Uuid]) -> Result<Vec<User>> {
        self.with_conn(|conn| get_users(conn, ids))
    }

    /// Look up by primary email first, then by verified aliases.
    pub fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.with_conn(|conn| get_user_by_email(conn, email))
    }

    pub fn users_with_contact(&self, contact_id: Uuid) -> Result<Vec<User>> {
        self.with_conn(|conn| users_with_contact(conn, contact_id))
    }

    pub fn all_user_ids(&self) -> Result<Vec<Uuid>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT id FROM users ORDER BY created_at")?;
            let ids = stmt
                .query_map([], |row| row.get::<_, String>(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            ids.iter().map(|id| Ok(id.parse::<Uuid>()?)).collect()
        })
    }

    pub fn delete_user(&self, id: Uuid) -> Result<()> {
        self.with_conn(|conn| delete_user(conn, id))
    }

    // -- Threads --

    pub fn put_thread(&self, thread: &Thread) -> Result<()> {
        self.with_conn(|conn| put_thread(conn, thread))
    }

    pub fn get_thread(&self, id: Uuid) -> Result<Option<Thread>> {
        self.with_conn(|conn| get_thread(conn, id))
    }

    pub fn threads_by_user(&self, user_id: Uuid) -> Result<Vec<Thread>> {
        self.with_conn(|conn| threads_by_user(conn, user_id))
    }

    // -- Events --

    pub fn put_event(&self, event: &Event) -> Result<()> {
        self.with_conn(|conn| put_event(conn, event))
    }

    pub fn get_event(&self, id: Uuid) -> Result<Option<Event>> {
        self.with_conn(|conn| get_event(conn, id))
    }

    pub fn events_by_user(&self, user_id: Uuid) -> Result<Vec<Event>> {
        self.with_conn(|conn| events_by_user(conn, user_id))
    }

    // -- Messages --

    pub fn put_message(&self, message: &Message) -> Result<()> {
        self.with_conn(|conn| put_message(conn, message))
    }

    /// Write a batch of messages atomically.
    pub fn put_messages(&self, messages: &[Message]) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            for message in messages {
                put_message(&tx, message)?;
            }
            tx.commit()?;
            Ok(())
        })
    }

    pub fn get_message(&self, id: Uuid) -> Result<Option<Message>> {
        self.with_conn(|conn| get_message(conn, id))
    }

    /// Children of a thread or event, oldest first.
    pub fn messages_by_parent(&self, parent_id: Uuid) -> Result<Vec<Message>> {
        self.with_conn(|conn| messages_by_parent(conn, parent_id))
    }

    pub fn messages_by_user(&self, user_id: Uuid) -> Result<Vec<Message>> {
        self.with_conn(|conn| messages_by_user(conn, user_id))
    }

    pub fn delete_message(&self, id: Uuid) -> Result<()> {
        self.with_conn(|conn| delete_message(conn, id))
    }
}

// -- Users --

pub(crate) fn put_user(conn: &Connection, user: &User) -> Result<()> {
    let Some(id) = user.id else {
        bail!("cannot save a user without a key");
    };

    conn.execute(
        &format!(
            "INSERT OR REPLACE INTO users ({USER_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)"
        ),
        params![
            id.to_string(),
            user.email,
            to_json(&user.emails)?,
            user.first_name,
            user.last_name,
            user.avatar,
            user.token,
            user.password_digest,
            user.oauth_google_id,
            user.oauth_facebook_id,
            user.verified,
            to_json(&user.contact_ids)?,
            user.created_at,
        ],
    )?;
    Ok(())
}

pub(crate) fn get_user(conn: &Connection, id: Uuid) -> Result<Option<User>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1");
    let user = conn
        .query_row(&sql, [id.to_string()], user_from_row)
        .optional()?;
    Ok(user)
}

pub(crate) fn get_users(conn: &Connection, ids: &[Uuid]) -> Result<Vec<User>> {
    let mut users = Vec::with_capacity(ids.len());
    for &id in ids {
        if let Some(user) = get_user(conn, id)? {
            users.push(user);
        }
    }
    Ok(users)
}

pub(crate) fn get_user_by_email(conn: &Connection, email: &str) -> Result<Option<User>> {
    let email = email.to_lowercase();

    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1");
    if let Some(user) = single_user(conn, &sql, &email, "email")? {
        return Ok(Some(user));
    }

    let sql = format!(
        "SELECT {USER_COLUMNS} FROM users
         WHERE EXISTS (SELECT 1 FROM json_each(users.emails) WHERE json_each.value = ?1)"
    );
    single_user(conn, &sql, &email, "emails")
}

pub(crate) fn users_with_contact(conn: &Connection, contact_id: Uuid) -> Result<Vec<User>> {
    let sql = format!(
        "SELECT {USER_COLUMNS} FROM users
         WHERE EXISTS (SELECT 1 FROM json_each(users.contact_ids) WHERE json_each.value = ?1)"
    );
    let mut stmt = conn.prepare(&sql)?;
    let users = stmt
        .query_map([contact_id.to_string()], user_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(users)
}

pub(crate) fn delete_user(conn: &Connection, id: Uuid) -> Result<()> {
    conn.execute("DELETE FROM users WHERE id = ?1", [id.to_string()])?;
    Ok(())
}

/// Runs a one-parameter user query that must match at most one row.
fn single_user(conn: &Connection, sql: &str, value: &str, field: &str) -> Result<Option<User>> {
    let mut stmt = conn.prepare(sql)?;
    let mut users = stmt
        .query_map([value], user_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    if users.len() > 1 {
        bail!("{} is duplicated", field);
    }
    Ok(users.pop())
}

// -- Threads --

pub(crate) fn put_thread(conn: &Connection, thread: &Thread) -> Result<()> {
    conn.execute(
        &format!("INSERT OR REPLACE INTO threads ({THREAD_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"),
        params![
            thread.id.to_string(),
            thread.owner_id.to_string(),
            to_json(&thread.user_ids)?,
            thread.subject,
            to_json(&thread.reads)?,
            thread.response_count,
            thread.created_at,
        ],
    )?;
    Ok(())
}

pub(crate) fn get_thread(conn: &Connection, id: Uuid) -> Result<Option<Thread>> {
    let sql = format!("SELECT {THREAD_COLUMNS} FROM threads WHERE id = ?1");
    let thread = conn
        .query_row(&sql, [id.to_string()], thread_from_row)
        .optional()?;
    Ok(thread)
}

/// Every thread the user owns or is a member of, newest first.
pub(crate) fn threads_by_user(conn: &Connection, user_id: Uuid) -> Result<Vec<Thread>> {
    let sql = format!(
        "SELECT {THREAD_COLUMNS} FROM threads
         WHERE owner_id = ?1
            OR EXISTS (SELECT 1 FROM json_each(threads.user_ids) WHERE json_each.value = ?1)
         ORDER BY created_at DESC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let threads = stmt
        .query_map([user_id.to_string()], thread_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(threads)
}

// -- Events --

pub(crate) fn put_event(conn: &Connection, event: &Event) -> Result<()> {
    conn.execute(
        &format!(
            "INSERT OR REPLACE INTO events ({EVENT_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"
        ),
        params![
            event.id.to_string(),
            event.owner_id.to_string(),
            to_json(&event.user_ids)?,
            to_json(&event.rsvp_ids)?,
            event.name,
            event.address,
            event.starts_at,
            to_json(&event.reads)?,
            event.created_at,
        ],
    )?;
    Ok(())
}

pub(crate) fn get_event(conn: &Connection, id: Uuid) -> Result<Option<Event>> {
    let sql = format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = ?1");
    let event = conn
        .query_row(&sql, [id.to_string()], event_from_row)
        .optional()?;
    Ok(event)
}

/// Every event the user owns, is invited to, or has RSVP'd to, newest first.
pub(crate) fn events_by_user(conn: &Connection, user_id: Uuid) -> Result<Vec<Event>> {
    let sql = format!(
        "SELECT {EVENT_COLUMNS} FROM events
         WHERE owner_id = ?1
            OR EXISTS (SELECT 1 FROM json_each(events.user_ids) WHERE json_each.value = ?1)
            OR EXISTS (SELECT 1 FROM json_each(events.rsvp_ids) WHERE json_each.value = ?1)
         ORDER BY created_at DESC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let events = stmt
        .query_map([user_id.to_string()], event_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(events)
}

// -- Messages --

pub(crate) fn put_message(conn: &Connection, message: &Message) -> Result<()> {
    conn.execute(
        &format!("INSERT OR REPLACE INTO messages ({MESSAGE_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"),
        params![
            message.id.to_string(),
            message.user_id.to_string(),
            message.parent_id.to_string(),
            message.body,
            message.timestamp,
            to_json(&message.reads)?,
            to_json(&message.photo_keys)?,
        ],
    )?;
    Ok(())
}

pub(crate) fn get_message(conn: &Connection, id: Uuid) -> Result<Option<Message>> {
    let sql = format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = ?1");
    let message = conn
        .query_row(&sql, [id.to_string()], message_from_row)
        .optional()?;
    Ok(message)
}

pub(crate) fn messages_by_parent(conn: &Connection, parent_id: Uuid) -> Result<Vec<Message>> {
    let sql = format!(
        "SELECT {MESSAGE_COLUMNS} FROM messages WHERE parent_id = ?1 ORDER BY timestamp ASC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let messages = stmt
        .query_map([parent_id.to_string()], message_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(messages)
}

pub(crate) fn messages_by_user(conn: &Connection, user_id: Uuid) -> Result<Vec<Message>> {
    let sql = format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE user_id = ?1");
    let mut stmt = conn.prepare(&sql)?;
    let messages = stmt
        .query_map([user_id.to_string()], message_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(messages)
}

pub(crate) fn delete_message(conn: &Connection, id: Uuid) -> Result<()> {
    conn.execute("DELETE FROM messages WHERE id = ?1", [id.to_string()])?;
    Ok(())
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use convo_types::read::mark_as_read;

    fn saved_user(db: &Database, email: &str) -> User {
        let mut user = User::new_incomplete(email);
        user.password_digest = "digest".into();
        user.verified = true;
        db.put_user(&mut user).unwrap();
        user
    }

    #[test]
    fn put_user_assigns_key_and_round_trips_lists() {
        let db = Database::open_in_memory().unwrap();
        let contact = saved_user(&db, "grace@example.com");

        let mut ada = User::new_incomplete("ada@example.com");
        ada.contact_ids.push(contact.id.unwrap());
        db.put_user(&mut ada).unwrap();

        let loaded = db.get_user(ada.id.unwrap()).unwrap().unwrap();
        assert_eq!(loaded.email, "ada@example.com");
        assert_eq!(loaded.contact_ids, vec![contact.id.unwrap()]);
        assert!(!loaded.verified);
    }

    #[test]
    fn user_by_email_falls_back_to_aliases() {
        let db = Database::open_in_memory().unwrap();
        let mut ada = saved_user(&db, "ada@example.com");
        ada.add_email("ada@work.com");
        db.put_user(&mut ada).unwrap();

        let by_primary = db.get_user_by_email("ADA@example.com").unwrap().unwrap();
        let by_alias = db.get_user_by_email("ada@work.com").unwrap().unwrap();

        assert_eq!(by_primary.id, ada.id);
        assert_eq!(by_alias.id, ada.id);
        assert!(db.get_user_by_email("nobody@example.com").unwrap().is_none());
    }

    #[test]
    fn duplicated_email_is_an_error() {
        let db = Database::open_in_memory().unwrap();
        saved_user(&db, "twin@example.com");
        saved_user(&db, "twin@example.com");

        assert!(db.get_user_by_email("twin@example.com").is_err());
    }

    #[test]
    fn users_with_contact_matches_json_members() {
        let db = Database::open_in_memory().unwrap();
        let target = saved_user(&db, "target@example.com");
        let mut a = saved_user(&db, "a@example.com");
        saved_user(&db, "b@example.com");
        a.contact_ids.push(target.id.unwrap());
        db.put_user(&mut a).unwrap();

        let found = db.users_with_contact(target.id.unwrap()).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, a.id);
    }

    #[test]
    fn threads_and_events_by_user_include_owner_and_members() {
        let db = Database::open_in_memory().unwrap();
        let ada = saved_user(&db, "ada@example.com");
        let grace = saved_user(&db, "grace@example.com");
        let linus = saved_user(&db, "linus@example.com");

        let thread = Thread::new("t", &ada, &[grace.clone()]).unwrap();
        db.put_thread(&thread).unwrap();
        let mut event = Event::new("e", "here", Utc::now(), &ada, &[]).unwrap();
        event.rsvp_ids.push(linus.id.unwrap());
        db.put_event(&event).unwrap();

        assert_eq!(db.threads_by_user(ada.id.unwrap()).unwrap().len(), 1);
        assert_eq!(db.threads_by_user(grace.id.unwrap()).unwrap().len(), 1);
        assert!(db.threads_by_user(linus.id.unwrap()).unwrap().is_empty());
        assert_eq!(db.events_by_user(linus.id.unwrap()).unwrap().len(), 1);
        assert!(db.events_by_user(grace.id.unwrap()).unwrap().is_empty());
    }

    #[test]
    fn messages_by_parent_are_oldest_first_with_reads() {
        let db = Database::open_in_memory().unwrap();
        let author = Uuid::new_v4();
        let parent = Uuid::new_v4();

        let mut first = Message::new(author, parent, "first");
        first.timestamp = Utc::now() - chrono::Duration::minutes(5);
        let mut second = Message::new(author, parent, "second");
        mark_as_read(&mut second, author);
        db.put_messages(&[second.clone(), first.clone()]).unwrap();

        let loaded = db.messages_by_parent(parent).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].body, "first");
        assert_eq!(loaded[1].reads.len(), 1);
        assert_eq!(db.messages_by_user(author).unwrap().len(), 2);

        db.delete_message(first.id).unwrap();
        assert!(db.get_message(first.id).unwrap().is_none());
    }
}
