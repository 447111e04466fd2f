//! Push synchronizer (queue drainer)
//!
//! Replays the mutation queue against the remote system strictly in enqueue
//! order. Outcomes are classified purely by status: success removes the item,
//! anything else records the failure and moves on. A failing item never
//! blocks the rest of the drain.

use crate::api::RemoteApi;
use crate::db::{MirrorStore, QueueRepository, SharedDatabase};
use crate::error::Result;
use crate::sync::events::{SyncEvent, SyncEvents};
use crate::util::unix_millis_now;

/// Outcome of one full drain pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct DrainReport {
    pub delivered: usize,
    pub failed: usize,
}

/// Attempt delivery of every drainable item, oldest first.
///
/// Only a storage-layer failure aborts the pass; remote rejections and
/// transport failures are recorded per item.
pub(crate) async fn drain_queue<A: RemoteApi>(
    db: &SharedDatabase,
    api: &A,
    events: &SyncEvents,
) -> Result<DrainReport> {
    let drainable = {
        let guard = db.lock().await;
        QueueRepository::new(guard.connection()).list_drainable().await?
    };

    let mut report = DrainReport::default();
    for item in drainable {
        {
            let guard = db.lock().await;
            QueueRepository::new(guard.connection())
                .mark_processing(&item.id)
                .await?;
        }

        let outcome = api.execute(item.method, &item.endpoint, &item.payload).await;

        let guard = db.lock().await;
        let repo = QueueRepository::new(guard.connection());
        match outcome {
            Ok(()) => {
                repo.mark_success(&item.id).await?;
                report.delivered += 1;
                drop(guard);
                tracing::info!("Delivered {} {} ({})", item.method, item.endpoint, item.title);
                events.emit(&SyncEvent::QueueChanged);
            }
            Err(error) => {
                let message = error.to_string();
                repo.mark_failure(&item.id, &message).await?;
                report.failed += 1;
                drop(guard);
                tracing::warn!(
                    "Delivery failed for {} {} ({}): {message}",
                    item.method,
                    item.endpoint,
                    item.title
                );
            }
        }
    }

    let guard = db.lock().await;
    MirrorStore::new(guard.connection())
        .set_last_sync_time(unix_millis_now())
        .await?;

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::fake::{FakeRemoteApi, FakeResponse};
    use crate::db::{shared, Database};
    use crate::models::{HttpMethod, QueueItem, QueueStatus};
    use crate::sync::queue::MutationQueue;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    async fn setup() -> (SharedDatabase, Arc<SyncEvents>, MutationQueue) {
        let db = shared(Database::open_in_memory().await.unwrap());
        let events = Arc::new(SyncEvents::new());
        let queue = MutationQueue::new(Arc::clone(&db), Arc::clone(&events));
        (db, events, queue)
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn successful_delivery_removes_item_and_notifies_once() {
        let (db, events, queue) = setup().await;
        let api = FakeRemoteApi::new();

        queue
            .enqueue(
                "/basestations/",
                HttpMethod::Post,
                "Register BS-1",
                json!({"code": "BS-1"}),
            )
            .await
            .unwrap();
        assert_eq!(queue.count().await.unwrap(), 1);

        let notified = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&notified);
        events.subscribe(move |event| {
            if *event == SyncEvent::QueueChanged {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

        let report = drain_queue(&db, &api, &events).await.unwrap();
        assert_eq!(report, DrainReport { delivered: 1, failed: 0 });
        assert_eq!(queue.count().await.unwrap(), 0);
        assert_eq!(notified.load(Ordering::SeqCst), 1);
        assert_eq!(api.executed_endpoints(), vec!["/basestations/"]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn rejection_marks_failed_with_serialized_body() {
        let (db, events, queue) = setup().await;
        let api = FakeRemoteApi::new();
        api.script(
            HttpMethod::Patch,
            "/transformers/7/",
            FakeResponse::Reject {
                status: 400,
                body: r#"{"serial_number":["already exists"]}"#.to_string(),
            },
        );

        let item = queue
            .enqueue(
                "/transformers/7/",
                HttpMethod::Patch,
                "Update TR-7",
                json!({"serial_number": "TR-7"}),
            )
            .await
            .unwrap();

        let report = drain_queue(&db, &api, &events).await.unwrap();
        assert_eq!(report, DrainReport { delivered: 0, failed: 1 });

        let stuck = queue.get(&item.id).await.unwrap().unwrap();
        assert_eq!(stuck.status, QueueStatus::Failed);
        assert_eq!(stuck.retry_count, 1);
        assert!(stuck.error.as_deref().unwrap().contains("serial_number"));
        assert_eq!(queue.list_all().await.unwrap().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn failures_do_not_abort_the_rest_of_the_drain() {
        let (db, events, queue) = setup().await;
        let api = FakeRemoteApi::new();
        api.script(
            HttpMethod::Post,
            "/inspections/",
            FakeResponse::TransportFailure,
        );

        // Enqueue with decreasing artificial timestamps to prove ordering is
        // by enqueue time, not insertion order
        let mut first = QueueItem::new("/inspections/", HttpMethod::Post, "A", json!({}));
        first.enqueued_at = 100;
        let mut second = QueueItem::new("/basestations/", HttpMethod::Post, "B", json!({}));
        second.enqueued_at = 200;
        let mut third = QueueItem::new("/feeders/", HttpMethod::Post, "C", json!({}));
        third.enqueued_at = 300;
        {
            let guard = db.lock().await;
            let repo = QueueRepository::new(guard.connection());
            repo.insert(&third).await.unwrap();
            repo.insert(&first).await.unwrap();
            repo.insert(&second).await.unwrap();
        }

        let report = drain_queue(&db, &api, &events).await.unwrap();
        assert_eq!(report, DrainReport { delivered: 2, failed: 1 });
        assert_eq!(
            api.executed_endpoints(),
            vec!["/inspections/", "/basestations/", "/feeders/"]
        );

        // Only the transport-failed item remains, still discoverable
        let remaining = queue.list_all().await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].endpoint, "/inspections/");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn failed_item_is_retried_on_the_next_pass() {
        let (db, events, queue) = setup().await;
        let api = FakeRemoteApi::new();
        api.script(
            HttpMethod::Post,
            "/basestations/",
            FakeResponse::Reject {
                status: 500,
                body: "server exploded".to_string(),
            },
        );

        let item = queue
            .enqueue("/basestations/", HttpMethod::Post, "Register", json!({}))
            .await
            .unwrap();

        drain_queue(&db, &api, &events).await.unwrap();
        // Remote recovers before the next cycle
        api.script(HttpMethod::Post, "/basestations/", FakeResponse::Success);
        let report = drain_queue(&db, &api, &events).await.unwrap();

        assert_eq!(report, DrainReport { delivered: 1, failed: 0 });
        assert!(queue.get(&item.id).await.unwrap().is_none());
        assert_eq!(api.executed_count(), 2);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn drain_records_last_sync_time() {
        let (db, events, _queue) = setup().await;
        let api = FakeRemoteApi::new();

        drain_queue(&db, &api, &events).await.unwrap();

        let guard = db.lock().await;
        let store = MirrorStore::new(guard.connection());
        assert!(store.last_sync_time().await.unwrap().is_some());
    }
}
