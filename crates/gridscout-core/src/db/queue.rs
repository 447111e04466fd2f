//! Mutation queue storage
//!
//! Persists not-yet-acknowledged write operations in enqueue order. Items
//! leave the queue only through successful delivery or explicit removal.

use libsql::{params, Connection, Row};

use super::connection::WriteBlock;
use crate::error::{Error, Result};
use crate::models::{QueueItem, QueueItemId, QueueStatus};

const ITEM_COLUMNS: &str =
    "id, endpoint, method, title, payload, enqueued_at, status, error, retry_count";

/// libSQL-backed storage for the mutation queue.
pub struct QueueRepository<'a> {
    conn: &'a Connection,
}

impl<'a> QueueRepository<'a> {
    /// Create a new repository over the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Persist a freshly-enqueued item.
    pub async fn insert(&self, item: &QueueItem) -> Result<()> {
        let payload = serde_json::to_string(&item.payload)?;
        let block = WriteBlock::begin(self.conn).await?;
        let outcome = self
            .conn
            .execute(
                "INSERT INTO sync_queue (id, endpoint, method, title, payload,
                     enqueued_at, status, error, retry_count)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, NULL, ?8)",
                params![
                    item.id.as_str(),
                    item.endpoint.as_str(),
                    item.method.as_str(),
                    item.title.as_str(),
                    payload.as_str(),
                    item.enqueued_at,
                    item.status.as_str(),
                    i64::from(item.retry_count)
                ],
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

    /// Load a single item by id.
    pub async fn get(&self, id: &QueueItemId) -> Result<Option<QueueItem>> {
        let mut rows = self
            .conn
            .query(
                &format!("SELECT {ITEM_COLUMNS} FROM sync_queue WHERE id = ?"),
                [id.as_str()],
            )
            .await?;

        if let Some(row) = rows.next().await? {
            Ok(Some(parse_item(&row)?))
        } else {
            Ok(None)
        }
    }

    /// Items eligible for the next drain pass, oldest first.
    ///
    /// The id tiebreak keeps replay order stable for items enqueued within
    /// the same millisecond (v7 ids are time-sortable).
    pub async fn list_drainable(&self) -> Result<Vec<QueueItem>> {
        self.query_items(&format!(
            "SELECT {ITEM_COLUMNS} FROM sync_queue
             WHERE status IN ('pending', 'failed')
             ORDER BY enqueued_at ASC, id ASC"
        ))
        .await
    }

    /// Every queued item, oldest first, for user-facing inspection.
    pub async fn list_all(&self) -> Result<Vec<QueueItem>> {
        self.query_items(&format!(
            "SELECT {ITEM_COLUMNS} FROM sync_queue ORDER BY enqueued_at ASC, id ASC"
        ))
        .await
    }

    /// Number of items currently queued.
    pub async fn count(&self) -> Result<u64> {
        let mut rows = self.conn.query("SELECT COUNT(*) FROM sync_queue", ()).await?;
        let count = match rows.next().await? {
            Some(row) => row.get::<i64>(0)?,
            None => 0,
        };
        Ok(u64::try_from(count).unwrap_or(0))
    }

    /// Flag an item as the one currently being attempted.
    pub async fn mark_processing(&self, id: &QueueItemId) -> Result<()> {
        self.set_status(id, QueueStatus::Processing).await
    }

    /// Remove a delivered item permanently.
    pub async fn mark_success(&self, id: &QueueItemId) -> Result<()> {
        let removed = self.remove(id).await?;
        if removed {
            Ok(())
        } else {
            Err(Error::NotFound(format!("queue item {id}")))
        }
    }

    /// Record a failed delivery attempt.
    ///
    /// Appends `message` to the accumulated error text (newline-joined,
    /// preserving history), increments `retry_count`, and returns the item
    /// to the drainable pool as `failed`.
    pub async fn mark_failure(&self, id: &QueueItemId, message: &str) -> Result<()> {
        let block = WriteBlock::begin(self.conn).await?;
        let outcome = self
            .conn
            .execute(
                "UPDATE sync_queue SET
                     status = 'failed',
                     retry_count = retry_count + 1,
                     error = CASE
                         WHEN error IS NULL THEN ?1
                         ELSE error || char(10) || ?1
                     END
                 WHERE id = ?2",
                params![message, id.as_str()],
            )
            .await;
        match outcome {
            Ok(0) => {
                block.rollback().await;
                Err(Error::NotFound(format!("queue item {id}")))
            }
            Ok(_) => block.commit().await,
            Err(e) => {
                block.rollback().await;
                Err(e.into())
            }
        }
    }

    /// Remove an item regardless of its delivery status (explicit discard).
    pub async fn remove(&self, id: &QueueItemId) -> Result<bool> {
        let block = WriteBlock::begin(self.conn).await?;
        let outcome = self
            .conn
            .execute("DELETE FROM sync_queue WHERE id = ?", [id.as_str()])
            .await;
        match outcome {
            Ok(rows) => {
                block.commit().await?;
                Ok(rows > 0)
            }
            Err(e) => {
                block.rollback().await;
                Err(e.into())
            }
        }
    }

    async fn set_status(&self, id: &QueueItemId, status: QueueStatus) -> Result<()> {
        let block = WriteBlock::begin(self.conn).await?;
        let outcome = self
            .conn
            .execute(
                "UPDATE sync_queue SET status = ?1 WHERE id = ?2",
                params![status.as_str(), id.as_str()],
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

    async fn query_items(&self, sql: &str) -> Result<Vec<QueueItem>> {
        let mut rows = self.conn.query(sql, ()).await?;
        let mut items = Vec::new();
        while let Some(row) = rows.next().await? {
            items.push(parse_item(&row)?);
        }
        Ok(items)
    }
}

fn parse_item(row: &Row) -> Result<QueueItem> {
    let id: String = row.get(0)?;
    let method: String = row.get(2)?;
    let payload: String = row.get(4)?;
    let status: String = row.get(6)?;
    let error = match row.get_value(7)? {
        libsql::Value::Text(text) => Some(text),
        _ => None,
    };
    let retry_count: i64 = row.get(8)?;

    Ok(QueueItem {
        id: id
            .parse()
            .map_err(|_| Error::Database(format!("invalid queue item id: {id}")))?,
        endpoint: row.get(1)?,
        method: method.parse()?,
        title: row.get(3)?,
        payload: serde_json::from_str(&payload)?,
        enqueued_at: row.get(5)?,
        status: status.parse()?,
        error,
        retry_count: u32::try_from(retry_count).unwrap_or(0),
    })
}
