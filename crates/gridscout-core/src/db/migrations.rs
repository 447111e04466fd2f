//! Database migrations

use crate::error::Result;
use libsql::Connection;

/// Current schema version
const CURRENT_VERSION: i32 = 1;

/// Run all pending migrations
pub async fn run(conn: &Connection) -> Result<()> {
    let version = get_version(conn).await?;

    if version < 1 {
        migrate_v1(conn).await?;
    }

    Ok(())
}

/// Get the current schema version
async fn get_version(conn: &Connection) -> Result<i32> {
    // Check if schema_version table exists
    let mut rows = conn
        .query(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
            (),
        )
        .await?;

    let exists: bool = if let Some(row) = rows.next().await? {
        row.get::<i32>(0)? != 0
    } else {
        false
    };

    if !exists {
        return Ok(0);
    }

    let mut rows = conn
        .query("SELECT COALESCE(MAX(version), 0) FROM schema_version", ())
        .await?;

    let version: i32 = if let Some(row) = rows.next().await? {
        row.get(0)?
    } else {
        0
    };

    Ok(version)
}

/// Migration to version 1: Initial schema
async fn migrate_v1(conn: &Connection) -> Result<()> {
    // libsql doesn't have execute_batch, so we run each statement separately
    // inside one transaction for atomicity

    conn.execute("BEGIN TRANSACTION", ()).await?;

    let statements = [
        // Schema version tracking
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        )",
        // One mirror table per server-owned collection, keyed by natural key.
        // The full record is kept as a JSON document; key and updated_at are
        // lifted out for indexing and reconciliation.
        "CREATE TABLE IF NOT EXISTS basestations (
            key TEXT PRIMARY KEY,
            updated_at INTEGER NOT NULL,
            data TEXT NOT NULL
        )",
        "CREATE INDEX IF NOT EXISTS idx_basestations_updated ON basestations(updated_at DESC)",
        "CREATE TABLE IF NOT EXISTS transformers (
            key TEXT PRIMARY KEY,
            updated_at INTEGER NOT NULL,
            data TEXT NOT NULL
        )",
        "CREATE INDEX IF NOT EXISTS idx_transformers_updated ON transformers(updated_at DESC)",
        "CREATE TABLE IF NOT EXISTS inspections (
            key TEXT PRIMARY KEY,
            updated_at INTEGER NOT NULL,
            data TEXT NOT NULL
        )",
        "CREATE INDEX IF NOT EXISTS idx_inspections_updated ON inspections(updated_at DESC)",
        "CREATE TABLE IF NOT EXISTS feeders (
            key TEXT PRIMARY KEY,
            updated_at INTEGER NOT NULL,
            data TEXT NOT NULL
        )",
        "CREATE INDEX IF NOT EXISTS idx_feeders_updated ON feeders(updated_at DESC)",
        // Mutation queue: ordered, durable list of unacknowledged writes
        "CREATE TABLE IF NOT EXISTS sync_queue (
            id TEXT PRIMARY KEY,
            endpoint TEXT NOT NULL,
            method TEXT NOT NULL,
            title TEXT NOT NULL,
            payload TEXT NOT NULL,
            enqueued_at INTEGER NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending',
            error TEXT,
            retry_count INTEGER NOT NULL DEFAULT 0
        )",
        "CREATE INDEX IF NOT EXISTS idx_sync_queue_enqueued ON sync_queue(enqueued_at ASC)",
        "CREATE INDEX IF NOT EXISTS idx_sync_queue_status ON sync_queue(status)",
        // Generic key/value metadata: pull watermarks, last sync time
        "CREATE TABLE IF NOT EXISTS sync_meta (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )",
        // Record migration version
        "INSERT INTO schema_version (version) VALUES (1)",
    ];

    for stmt in statements {
        if let Err(e) = conn.execute(stmt, ()).await {
            conn.execute("ROLLBACK", ()).await.ok();
            return Err(e.into());
        }
    }

    if let Err(e) = conn.execute("COMMIT", ()).await {
        conn.execute("ROLLBACK", ()).await.ok();
        return Err(e.into());
    }

    tracing::info!("Migrated database to version {CURRENT_VERSION}");
    Ok(())
}
