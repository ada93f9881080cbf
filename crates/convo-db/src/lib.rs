pub mod migrations;
pub mod queries;
mod rows;
pub mod unit_of_work;

use anyhow::Result;
use rusqlite::{Connection, TransactionBehavior};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::info;

pub use unit_of_work::UnitOfWork;

/// Document store over a single SQLite connection. Every entity is one row;
/// list-valued fields live in JSON columns and are queried with `json_each`.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        // WAL mode for concurrent reads
        conn.pragma_update(None, "journal_mode", "WAL")?;

        migrations::run(&conn)?;

        info!("Database opened at {}", path.display());
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        migrations::run(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.lock()?;
        f(&conn)
    }

    pub fn with_conn_mut<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T>,
    {
        let mut conn = self.lock()?;
        f(&mut conn)
    }

    /// Take the connection for a multi-step write. Call
    /// [`Writer::begin`] on the result to open a [`UnitOfWork`].
    pub fn writer(&self) -> Result<Writer<'_>> {
        Ok(Writer { conn: self.lock()? })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| anyhow::anyhow!("DB lock poisoned: {}", e))
    }
}

/// Exclusive hold on the connection, alive for the length of one unit of work.
pub struct Writer<'a> {
    conn: MutexGuard<'a, Connection>,
}

impl Writer<'_> {
    /// Open an immediate (write-locking) transaction. Dropping the returned
    /// unit of work without calling `commit` rolls everything back.
    pub fn begin(&mut self) -> Result<UnitOfWork<'_>> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        Ok(UnitOfWork::new(tx))
    }
}
