//! Pull synchronizer
//!
//! Fetches incremental changes per collection using a stored watermark and
//! merges them into the local mirror. A collection with no watermark gets a
//! full pull, which additionally reconciles server-side deletions.
//! Failures are isolated per collection: one broken pull never aborts the
//! others or the enclosing cycle.

use std::collections::HashSet;

use crate::api::RemoteApi;
use crate::db::{MirrorStore, SharedDatabase};
use crate::error::Result;
use crate::models::{BaseStation, Feeder, Inspection, MirrorEntity, Transformer};

/// Pull every collection concurrently; returns how many collections failed.
pub(crate) async fn pull_all<A: RemoteApi>(db: &SharedDatabase, api: &A) -> usize {
    let outcomes = tokio::join!(
        pull_logged::<BaseStation, A>(db, api),
        pull_logged::<Transformer, A>(db, api),
        pull_logged::<Inspection, A>(db, api),
        pull_logged::<Feeder, A>(db, api),
    );

    let succeeded = [outcomes.0, outcomes.1, outcomes.2, outcomes.3];
    succeeded.iter().filter(|ok| !**ok).count()
}

async fn pull_logged<E: MirrorEntity, A: RemoteApi>(db: &SharedDatabase, api: &A) -> bool {
    match pull_collection::<E, A>(db, api).await {
        Ok(()) => true,
        Err(error) => {
            // Local data and watermark are untouched; next cycle retries
            tracing::warn!("Pull failed for {}: {error}", E::COLLECTION);
            false
        }
    }
}

/// Run one collection's pull to completion.
async fn pull_collection<E: MirrorEntity, A: RemoteApi>(db: &SharedDatabase, api: &A) -> Result<()> {
    let collection = E::COLLECTION;

    let watermark = {
        let db = db.lock().await;
        MirrorStore::new(db.connection()).watermark(collection).await?
    };
    let full_sync = watermark.is_none();

    // Follow pagination to exhaustion before touching the store
    let mut raw = Vec::new();
    let mut page = 1;
    loop {
        let batch = api.fetch_changed(collection, watermark, page).await?;
        let last = batch.is_last();
        raw.extend(batch.results);
        if last {
            break;
        }
        page += 1;
    }

    // Nothing changed remotely: leave local state and watermark untouched
    if raw.is_empty() {
        tracing::debug!("{collection}: no changes since last pull");
        return Ok(());
    }

    // A parse failure aborts this collection only
    let mut records = Vec::with_capacity(raw.len());
    for value in raw {
        records.push(serde_json::from_value::<E>(value)?);
    }

    let max_updated_at = records
        .iter()
        .map(MirrorEntity::updated_at)
        .max()
        .unwrap_or_default();

    let db = db.lock().await;
    let store = MirrorStore::new(db.connection());
    store.upsert_batch(&records).await?;

    if full_sync {
        // The response is the complete server state: reconcile deletions
        let keys: HashSet<String> = records
            .iter()
            .map(|record| record.natural_key().to_string())
            .collect();
        let deleted = store.retain_keys(collection, &keys).await?;
        if deleted > 0 {
            tracing::info!("{collection}: removed {deleted} records deleted remotely");
        }
    }

    // Persisted last, and only after the pull completed without error
    store.set_watermark(collection, max_updated_at).await?;
    tracing::debug!("{collection}: merged {} changed records", records.len());
    Ok(())
}
