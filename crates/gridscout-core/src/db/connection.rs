//! Database connection management

use crate::error::Result;
use libsql::{Builder, Connection};
use std::path::Path;

use super::migrations;

/// Database wrapper for libSQL connections
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open a local database at the given path, creating it if it doesn't exist
    ///
    /// Runs migrations automatically. A failure here is fatal: continuing with
    /// a broken store is unsafe.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path_str = path.as_ref().to_string_lossy().to_string();
        let db = Builder::new_local(&path_str).build().await?;
        let conn = db.connect()?;

        let database = Self { conn };
        database.configure().await?;
        database.migrate().await?;
        Ok(database)
    }

    /// Open an in-memory database (useful for testing)
    pub async fn open_in_memory() -> Result<Self> {
        let db = Builder::new_local(":memory:").build().await?;
        let conn = db.connect()?;

        let database = Self { conn };
        database.configure().await?;
        database.migrate().await?;
        Ok(database)
    }

    /// Configure `SQLite` for concurrent readers with a single writer
    async fn configure(&self) -> Result<()> {
        // WAL keeps the last-committed state visible to readers while a
        // write block is open.
        self.conn
            .execute("PRAGMA journal_mode = WAL;", ())
            .await
            .ok(); // Not supported for :memory: databases
        self.conn
            .execute("PRAGMA synchronous = NORMAL;", ())
            .await
            .ok();
        self.conn.execute("PRAGMA foreign_keys = ON;", ()).await?;
        Ok(())
    }

    /// Run database migrations
    async fn migrate(&self) -> Result<()> {
        migrations::run(&self.conn).await
    }

    /// Get a reference to the underlying connection
    pub const fn connection(&self) -> &Connection {
        &self.conn
    }
}

/// An open transaction serializing writers against this database.
///
/// Every mutating store operation runs inside one of these so a batch either
/// fully applies or not at all. Callers must finish the block with
/// [`WriteBlock::commit`] or [`WriteBlock::rollback`] before returning.
pub struct WriteBlock<'a> {
    conn: &'a Connection,
}

impl<'a> WriteBlock<'a> {
    /// Start a write block. `BEGIN IMMEDIATE` takes the writer slot up front
    /// so the batch cannot deadlock against a later writer.
    pub async fn begin(conn: &'a Connection) -> Result<WriteBlock<'a>> {
        conn.execute("BEGIN IMMEDIATE", ()).await?;
        Ok(Self { conn })
    }

    /// Make the batch visible to subsequent reads.
    pub async fn commit(self) -> Result<()> {
        self.conn.execute("COMMIT", ()).await?;
        Ok(())
    }

    /// Abort the batch, retaining the prior state.
    pub async fn rollback(self) {
        self.conn.execute("ROLLBACK", ()).await.ok();
    }
}
