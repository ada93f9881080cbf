//! Row <-> entity mapping. Ids are stored as hyphenated UUID text and list
//! fields as JSON arrays.

use rusqlite::Row;
use rusqlite::types::Type;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use convo_types::{Event, Message, Thread, User};

pub const USER_COLUMNS: &str = "id, email, emails, first_name, last_name, avatar, token, \
     password_digest, oauth_google_id, oauth_facebook_id, verified, contact_ids, created_at";

pub const THREAD_COLUMNS: &str =
    "id, owner_id, user_ids, subject, reads, response_count, created_at";

pub const EVENT_COLUMNS: &str =
    "id, owner_id, user_ids, rsvp_ids, name, address, starts_at, reads, created_at";

pub const MESSAGE_COLUMNS: &str = "id, user_id, parent_id, body, timestamp, reads, photo_keys";

pub fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    let mut user = User {
        id: Some(uuid_col(row, 0)?),
        email: row.get(1)?,
        emails: json_col(row, 2)?,
        first_name: row.get(3)?,
        last_name: row.get(4)?,
        avatar: row.get(5)?,
        token: row.get(6)?,
        password_digest: row.get(7)?,
        oauth_google_id: row.get(8)?,
        oauth_facebook_id: row.get(9)?,
        verified: row.get(10)?,
        contact_ids: json_col(row, 11)?,
        created_at: row.get(12)?,
        ..User::default()
    };
    user.derive_properties();
    Ok(user)
}

pub fn thread_from_row(row: &Row<'_>) -> rusqlite::Result<Thread> {
    Ok(Thread {
        id: uuid_col(row, 0)?,
        owner_id: uuid_col(row, 1)?,
        user_ids: json_col(row, 2)?,
        subject: row.get(3)?,
        reads: json_col(row, 4)?,
        response_count: row.get(5)?,
        created_at: row.get(6)?,
    })
}

pub fn event_from_row(row: &Row<'_>) -> rusqlite::Result<Event> {
    Ok(Event {
        id: uuid_col(row, 0)?,
        owner_id: uuid_col(row, 1)?,
        user_ids: json_col(row, 2)?,
        rsvp_ids: json_col(row, 3)?,
        name: row.get(4)?,
        address: row.get(5)?,
        starts_at: row.get(6)?,
        reads: json_col(row, 7)?,
        created_at: row.get(8)?,
    })
}

pub fn message_from_row(row: &Row<'_>) -> rusqlite::Result<Message> {
    Ok(Message {
        id: uuid_col(row, 0)?,
        user_id: uuid_col(row, 1)?,
        parent_id: uuid_col(row, 2)?,
        body: row.get(3)?,
        timestamp: row.get(4)?,
        reads: json_col(row, 5)?,
        photo_keys: json_col(row, 6)?,
    })
}

fn uuid_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<Uuid> {
    let raw: String = row.get(idx)?;
    raw.parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn json_col<T: DeserializeOwned>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}
