//! Mutation queue service
//!
//! The write path every mutation goes through: enqueue locally (always
//! succeeds, no network involved), then let the next sync cycle attempt
//! delivery. Wraps the queue storage behind the shared database handle and
//! publishes `QueueChanged` notifications.

use std::sync::Arc;

use crate::db::{QueueRepository, SharedDatabase};
use crate::error::Result;
use crate::models::{HttpMethod, QueueItem, QueueItemId};
use crate::sync::events::{SyncEvent, SyncEvents};

/// Application-facing mutation queue.
#[derive(Clone)]
pub struct MutationQueue {
    db: SharedDatabase,
    events: Arc<SyncEvents>,
}

impl MutationQueue {
    pub fn new(db: SharedDatabase, events: Arc<SyncEvents>) -> Self {
        Self { db, events }
    }

    /// Queue a write operation for later delivery.
    ///
    /// Local-only: assigns a fresh id, stamps the enqueue time, and never
    /// touches the network.
    pub async fn enqueue(
        &self,
        endpoint: impl Into<String>,
        method: HttpMethod,
        title: impl Into<String>,
        payload: serde_json::Value,
    ) -> Result<QueueItem> {
        let item = QueueItem::new(endpoint, method, title, payload);
        {
            let db = self.db.lock().await;
            QueueRepository::new(db.connection()).insert(&item).await?;
        }
        tracing::debug!("Enqueued {} {} ({})", item.method, item.endpoint, item.title);
        self.events.emit(&SyncEvent::QueueChanged);
        Ok(item)
    }

    /// Every queued item, for user-facing inspection.
    pub async fn list_all(&self) -> Result<Vec<QueueItem>> {
        let db = self.db.lock().await;
        QueueRepository::new(db.connection()).list_all().await
    }

    /// Number of queued items.
    pub async fn count(&self) -> Result<u64> {
        let db = self.db.lock().await;
        QueueRepository::new(db.connection()).count().await
    }

    /// Load one item by id.
    pub async fn get(&self, id: &QueueItemId) -> Result<Option<QueueItem>> {
        let db = self.db.lock().await;
        QueueRepository::new(db.connection()).get(id).await
    }

    /// Discard an item regardless of delivery status (explicit user action).
    pub async fn remove(&self, id: &QueueItemId) -> Result<bool> {
        let removed = {
            let db = self.db.lock().await;
            QueueRepository::new(db.connection()).remove(id).await?
        };
        if removed {
            tracing::info!("Discarded queued mutation {id}");
            self.events.emit(&SyncEvent::QueueChanged);
        }
        Ok(removed)
    }
}
