use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id                  TEXT PRIMARY KEY,
                email               TEXT NOT NULL,
                emails              TEXT NOT NULL DEFAULT '[]',
                first_name          TEXT NOT NULL DEFAULT '',
                last_name           TEXT NOT NULL DEFAULT '',
                avatar              TEXT NOT NULL DEFAULT '',
                token               TEXT NOT NULL,
                password_digest     TEXT NOT NULL DEFAULT '',
                oauth_google_id     TEXT NOT NULL DEFAULT '',
                oauth_facebook_id   TEXT NOT NULL DEFAULT '',
                verified            INTEGER NOT NULL DEFAULT 0,
                contact_ids         TEXT NOT NULL DEFAULT '[]',
                created_at          TEXT NOT NULL
            );

            CREATE INDEX idx_users_email ON users(email);
            CREATE INDEX idx_users_token ON users(token);

            CREATE TABLE threads (
                id              TEXT PRIMARY KEY,
                owner_id        TEXT NOT NULL,
                user_ids        TEXT NOT NULL DEFAULT '[]',
                subject         TEXT NOT NULL DEFAULT '',
                reads           TEXT NOT NULL DEFAULT '[]',
                response_count  INTEGER NOT NULL DEFAULT 0,
                created_at      TEXT NOT NULL
            );

            CREATE TABLE events (
                id          TEXT PRIMARY KEY,
                owner_id    TEXT NOT NULL,
                user_ids    TEXT NOT NULL DEFAULT '[]',
                rsvp_ids    TEXT NOT NULL DEFAULT '[]',
                name        TEXT NOT NULL DEFAULT '',
                address     TEXT NOT NULL DEFAULT '',
                starts_at   TEXT NOT NULL,
                reads       TEXT NOT NULL DEFAULT '[]',
                created_at  TEXT NOT NULL
            );

            CREATE TABLE messages (
                id          TEXT PRIMARY KEY,
                user_id     TEXT NOT NULL,
                parent_id   TEXT NOT NULL,
                body        TEXT NOT NULL DEFAULT '',
                timestamp   TEXT NOT NULL,
                reads       TEXT NOT NULL DEFAULT '[]',
                photo_keys  TEXT NOT NULL DEFAULT '[]'
            );

            CREATE INDEX idx_messages_parent ON messages(parent_id, timestamp);
            CREATE INDEX idx_messages_user ON messages(user_id);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
