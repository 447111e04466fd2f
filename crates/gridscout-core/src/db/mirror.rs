//! Local mirror store for server-owned entity collections
//!
//! Pure storage: no network awareness. Mirror tables are written only by the
//! pull synchronizer (bulk upsert) or full-sync reconciliation, and every
//! mutating operation runs inside a [`WriteBlock`] so a batch either fully
//! applies or not at all.

use std::collections::HashSet;

use libsql::{params, Connection};

use super::connection::WriteBlock;
use crate::error::Result;
use crate::models::{Collection, MirrorEntity};

/// `sync_meta` key recording when the last queue drain finished (Unix ms).
const LAST_SYNC_KEY: &str = "last_sync_time";

/// libSQL-backed store for mirrored collections and sync metadata.
pub struct MirrorStore<'a> {
    conn: &'a Connection,
}

impl<'a> MirrorStore<'a> {
    /// Create a new store over the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Upsert a batch of records by natural key.
    ///
    /// Existing rows are overwritten field-by-field; unknown keys insert.
    /// Re-applying the same batch is a no-op (idempotent merge).
    pub async fn upsert_batch<E: MirrorEntity>(&self, records: &[E]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        let table = E::COLLECTION.table();

        // Serialize before opening the write block so a malformed record
        // cannot leave a transaction dangling.
        let mut docs = Vec::with_capacity(records.len());
        for record in records {
            docs.push((
                record.natural_key().to_string(),
                record.updated_at(),
                serde_json::to_string(record)?,
            ));
        }

        let sql = format!(
            "INSERT INTO {table} (key, updated_at, data) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET
                 updated_at = excluded.updated_at,
                 data = excluded.data"
        );

        let block = WriteBlock::begin(self.conn).await?;
        for (key, updated_at, doc) in &docs {
            let outcome = self
                .conn
                .execute(&sql, params![key.as_str(), *updated_at, doc.as_str()])
                .await;
            if let Err(e) = outcome {
                block.rollback().await;
                return Err(e.into());
            }
        }
        block.commit().await
    }

    /// Load every record of a collection, ordered by natural key.
    pub async fn get_all<E: MirrorEntity>(&self) -> Result<Vec<E>> {
        let table = E::COLLECTION.table();
        let mut rows = self
            .conn
            .query(&format!("SELECT data FROM {table} ORDER BY key"), ())
            .await?;

        let mut records = Vec::new();
        while let Some(row) = rows.next().await? {
            let doc: String = row.get(0)?;
            records.push(serde_json::from_str(&doc)?);
        }
        Ok(records)
    }

    /// Load a single record by natural key.
    pub async fn get_by_key<E: MirrorEntity>(&self, key: &str) -> Result<Option<E>> {
        match self.get_raw_by_key(E::COLLECTION, key).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// Load every record of a collection as raw JSON documents.
    ///
    /// Used by the offline read adapter, which filters on fields without
    /// caring about the concrete entity type.
    pub async fn get_all_raw(&self, collection: Collection) -> Result<Vec<serde_json::Value>> {
        let table = collection.table();
        let mut rows = self
            .conn
            .query(&format!("SELECT data FROM {table} ORDER BY key"), ())
            .await?;

        let mut records = Vec::new();
        while let Some(row) = rows.next().await? {
            let doc: String = row.get(0)?;
            records.push(serde_json::from_str(&doc)?);
        }
        Ok(records)
    }

    /// Load every record of a collection as `(natural key, document)` pairs.
    ///
    /// The related-key filters of the offline read adapter resolve matching
    /// keys of a referenced collection through this.
    pub async fn get_keyed_raw(
        &self,
        collection: Collection,
    ) -> Result<Vec<(String, serde_json::Value)>> {
        let table = collection.table();
        let mut rows = self
            .conn
            .query(&format!("SELECT key, data FROM {table} ORDER BY key"), ())
            .await?;

        let mut records = Vec::new();
        while let Some(row) = rows.next().await? {
            let key: String = row.get(0)?;
            let doc: String = row.get(1)?;
            records.push((key, serde_json::from_str(&doc)?));
        }
        Ok(records)
    }

    /// Load a single raw JSON document by natural key.
    pub async fn get_raw_by_key(
        &self,
        collection: Collection,
        key: &str,
    ) -> Result<Option<serde_json::Value>> {
        let table = collection.table();
        let mut rows = self
            .conn
            .query(&format!("SELECT data FROM {table} WHERE key = ?"), [key])
            .await?;

        if let Some(row) = rows.next().await? {
            let doc: String = row.get(0)?;
            Ok(Some(serde_json::from_str(&doc)?))
        } else {
            Ok(None)
        }
    }

    /// Delete every record matching the predicate; returns the deleted count.
    pub async fn delete_where<E, P>(&self, predicate: P) -> Result<usize>
    where
        E: MirrorEntity,
        P: Fn(&E) -> bool,
    {
        let table = E::COLLECTION.table();
        let mut rows = self
            .conn
            .query(&format!("SELECT key, data FROM {table}"), ())
            .await?;

        let mut doomed = Vec::new();
        while let Some(row) = rows.next().await? {
            let key: String = row.get(0)?;
            let doc: String = row.get(1)?;
            let entity: E = serde_json::from_str(&doc)?;
            if predicate(&entity) {
                doomed.push(key);
            }
        }

        self.delete_keys(table, &doomed).await?;
        Ok(doomed.len())
    }

    /// Delete every record of a collection whose key is NOT in `keys`.
    ///
    /// Full-sync reconciliation: the response is the complete server state,
    /// so anything missing from it was deleted remotely.
    pub async fn retain_keys(
        &self,
        collection: Collection,
        keys: &HashSet<String>,
    ) -> Result<usize> {
        let table = collection.table();
        let mut rows = self
            .conn
            .query(&format!("SELECT key FROM {table}"), ())
            .await?;

        let mut doomed = Vec::new();
        while let Some(row) = rows.next().await? {
            let key: String = row.get(0)?;
            if !keys.contains(&key) {
                doomed.push(key);
            }
        }

        self.delete_keys(table, &doomed).await?;
        Ok(doomed.len())
    }

    async fn delete_keys(&self, table: &str, keys: &[String]) -> Result<()> {
        if keys.is_empty() {
            return Ok(());
        }
        let sql = format!("DELETE FROM {table} WHERE key = ?");
        let block = WriteBlock::begin(self.conn).await?;
        for key in keys {
            if let Err(e) = self.conn.execute(&sql, [key.as_str()]).await {
                block.rollback().await;
                return Err(e.into());
            }
        }
        block.commit().await
    }

    /// Read a collection's pull watermark. Absence means "never synced".
    pub async fn watermark(&self, collection: Collection) -> Result<Option<i64>> {
        let value = self.meta_get(&collection.watermark_key()).await?;
        Ok(value.and_then(|v| v.parse().ok()))
    }

    /// Advance a collection's watermark to `candidate`.
    ///
    /// Watermarks are monotonic non-decreasing: a candidate at or below the
    /// stored value is ignored. Returns whether the watermark advanced.
    pub async fn set_watermark(&self, collection: Collection, candidate: i64) -> Result<bool> {
        let key = collection.watermark_key();
        let block = WriteBlock::begin(self.conn).await?;

        let outcome = async {
            let current = self.meta_lookup(&key).await?;
            let current: Option<i64> = current.and_then(|v| v.parse().ok());
            if current.is_some_and(|stored| candidate <= stored) {
                return Ok(false);
            }
            self.conn
                .execute(
                    "INSERT OR REPLACE INTO sync_meta (key, value) VALUES (?1, ?2)",
                    params![key.as_str(), candidate.to_string()],
                )
                .await?;
            Ok(true)
        }
        .await;

        match outcome {
            Ok(advanced) => {
                block.commit().await?;
                Ok(advanced)
            }
            Err(e) => {
                block.rollback().await;
                Err(e)
            }
        }
    }

    /// Drop every collection's watermark, forcing full pulls next cycle.
    ///
    /// Manual recovery path: a full pull also reconciles deletions.
    pub async fn clear_watermarks(&self) -> Result<()> {
        let block = WriteBlock::begin(self.conn).await?;
        for collection in Collection::ALL {
            let outcome = self
                .conn
                .execute(
                    "DELETE FROM sync_meta WHERE key = ?",
                    [collection.watermark_key().as_str()],
                )
                .await;
            if let Err(e) = outcome {
                block.rollback().await;
                return Err(e.into());
            }
        }
        block.commit().await
    }

    /// When the last queue drain finished (Unix ms), if ever.
    pub async fn last_sync_time(&self) -> Result<Option<i64>> {
        let value = self.meta_get(LAST_SYNC_KEY).await?;
        Ok(value.and_then(|v| v.parse().ok()))
    }

    /// Record when a queue drain finished (Unix ms).
    pub async fn set_last_sync_time(&self, timestamp: i64) -> Result<()> {
        self.meta_set(LAST_SYNC_KEY, &timestamp.to_string()).await
    }

    /// Read a generic metadata value.
    pub async fn meta_get(&self, key: &str) -> Result<Option<String>> {
        self.meta_lookup(key).await
    }

    /// Write a generic metadata value.
    pub async fn meta_set(&self, key: &str, value: &str) -> Result<()> {
        let block = WriteBlock::begin(self.conn).await?;
        let outcome = self
            .conn
            .execute(
                "INSERT OR REPLACE INTO sync_meta (key, value) VALUES (?1, ?2)",
                params![key, value],
            )
            .await;
        match outcome {
            Ok(_) => block.commit().await,
            Err(e) => {
                block.rollback().await;
                Err(e.into())
            }
        }
    }

    async fn meta_lookup(&self, key: &str) -> Result<Option<String>> {
        let mut rows = self
            .conn
            .query("SELECT value FROM sync_meta WHERE key = ?", [key])
            .await?;

        if let Some(row) = rows.next().await? {
            let value: String = row.get(0)?;
            Ok(Some(value))
        } else {
            Ok(None)
        }
    }
}
