//! Offline read adapter
//!
//! Serves list and detail reads to the application layer, delegating to the
//! remote API while connected and falling back to the local mirror while
//! offline. Offline lists emulate the remote pagination envelope so callers
//! cannot tell which side answered.

use std::collections::HashSet;
use std::sync::Arc;

use serde_json::Value;

use crate::api::RemoteApi;
use crate::connectivity::ConnectivityMonitor;
use crate::db::{MirrorStore, SharedDatabase};
use crate::error::Result;
use crate::models::{Collection, Filter, ListQuery, Page};

/// Connectivity-transparent read access to mirrored collections.
pub struct ReadAdapter<A: RemoteApi> {
    db: SharedDatabase,
    api: Arc<A>,
    connectivity: ConnectivityMonitor,
}

impl<A: RemoteApi> ReadAdapter<A> {
    pub fn new(db: SharedDatabase, api: Arc<A>, connectivity: ConnectivityMonitor) -> Self {
        Self {
            db,
            api,
            connectivity,
        }
    }

    /// List a collection with filters and pagination.
    pub async fn list(&self, collection: Collection, query: &ListQuery) -> Result<Page<Value>> {
        if self.connectivity.is_connected() {
            return self.api.list(collection, query).await;
        }
        self.list_local(collection, query).await
    }

    /// Fetch a single record by natural key.
    pub async fn get(&self, collection: Collection, key: &str) -> Result<Option<Value>> {
        if self.connectivity.is_connected() {
            return self.api.get(collection, key).await;
        }
        let db = self.db.lock().await;
        MirrorStore::new(db.connection())
            .get_raw_by_key(collection, key)
            .await
    }

    async fn list_local(&self, collection: Collection, query: &ListQuery) -> Result<Page<Value>> {
        // One lock for the whole read: filters and page slicing see a single
        // committed snapshot of the store
        let db = self.db.lock().await;
        let store = MirrorStore::new(db.connection());

        // Resolve cross-collection filters to key sets first
        let mut related = Vec::with_capacity(query.filters.len());
        for filter in &query.filters {
            if let Filter::RelatedEq {
                collection: referenced,
                field,
                value,
                ..
            } = filter
            {
                let keyed = store.get_keyed_raw(*referenced).await?;
                let allowed: HashSet<String> = keyed
                    .into_iter()
                    .filter(|(_, doc)| matches_eq(doc, field, value))
                    .map(|(key, _)| key)
                    .collect();
                related.push(Some(allowed));
            } else {
                related.push(None);
            }
        }

        let rows = store.get_all_raw(collection).await?;
        let matched: Vec<Value> = rows
            .into_iter()
            .filter(|record| {
                query
                    .filters
                    .iter()
                    .zip(&related)
                    .all(|(filter, allowed)| record_matches(record, filter, allowed.as_ref()))
            })
            .collect();

        Ok(paginate(collection, query, matched))
    }
}

/// Slice the matched set into the remote system's envelope shape.
fn paginate(collection: Collection, query: &ListQuery, matched: Vec<Value>) -> Page<Value> {
    let count = matched.len() as u64;
    let offset = query.offset();
    let results: Vec<Value> = matched
        .into_iter()
        .skip(usize::try_from(offset).unwrap_or(usize::MAX))
        .take(usize::try_from(query.page_size).unwrap_or(usize::MAX))
        .collect();

    let next = (offset + query.page_size < count)
        .then(|| page_link(collection, query.page + 1, query.page_size));
    let previous = (query.page > 1).then(|| page_link(collection, query.page - 1, query.page_size));

    Page {
        count,
        next,
        previous,
        results,
    }
}

fn page_link(collection: Collection, page: u64, page_size: u64) -> String {
    format!(
        "{}?page={page}&page_size={page_size}",
        collection.endpoint()
    )
}

fn record_matches(record: &Value, filter: &Filter, allowed: Option<&HashSet<String>>) -> bool {
    match filter {
        Filter::Eq { field, value } => matches_eq(record, field, value),
        Filter::Contains { field, value } => field_text(record, field)
            .is_some_and(|text| text.to_lowercase().contains(&value.to_lowercase())),
        Filter::RelatedEq { key_field, .. } => allowed.is_some_and(|keys| {
            field_text(record, key_field).is_some_and(|key| keys.contains(&key))
        }),
    }
}

fn matches_eq(record: &Value, field: &str, value: &str) -> bool {
    field_text(record, field).is_some_and(|text| text == value)
}

/// Textual view of a scalar field, for filter comparison.
fn field_text(record: &Value, field: &str) -> Option<String> {
    match record.get(field)? {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::fake::FakeRemoteApi;
    use crate::connectivity::connectivity_channel;
    use crate::db::{shared, Database};
    use crate::models::{BaseStation, Transformer};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn station(code: &str, region: &str, name: &str) -> BaseStation {
        BaseStation {
            code: code.to_string(),
            name: name.to_string(),
            region: region.to_string(),
            district: "Central".to_string(),
            latitude: 0.0,
            longitude: 0.0,
            status: "active".to_string(),
            updated_at: 100,
        }
    }

    fn transformer(serial: &str, station_code: &str) -> Transformer {
        Transformer {
            serial_number: serial.to_string(),
            station_code: station_code.to_string(),
            model: "T500".to_string(),
            rated_kva: 500.0,
            status: "in_service".to_string(),
            updated_at: 100,
        }
    }

    async fn offline_adapter() -> (ReadAdapter<FakeRemoteApi>, SharedDatabase) {
        let db = shared(Database::open_in_memory().await.unwrap());
        let api = Arc::new(FakeRemoteApi::new());
        let (_handle, monitor) = connectivity_channel(false);
        (
            ReadAdapter::new(Arc::clone(&db), api, monitor),
            db,
        )
    }

    async fn seed_stations(db: &SharedDatabase, stations: &[BaseStation]) {
        let guard = db.lock().await;
        MirrorStore::new(guard.connection())
            .upsert_batch(stations)
            .await
            .unwrap();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn offline_list_emulates_the_remote_envelope() {
        let (adapter, db) = offline_adapter().await;
        seed_stations(
            &db,
            &[
                station("BS-1", "North", "Alpha"),
                station("BS-2", "North", "Bravo"),
                station("BS-3", "North", "Charlie"),
                station("BS-4", "North", "Delta"),
                station("BS-5", "North", "Echo"),
            ],
        )
        .await;

        let query = ListQuery::new().with_page(2).with_page_size(2);
        let page = adapter.list(Collection::BaseStations, &query).await.unwrap();

        assert_eq!(page.count, 5);
        assert_eq!(page.results.len(), 2);
        assert_eq!(page.results[0]["code"], "BS-3");
        assert_eq!(
            page.next.as_deref(),
            Some("/basestations/?page=3&page_size=2")
        );
        assert_eq!(
            page.previous.as_deref(),
            Some("/basestations/?page=1&page_size=2")
        );

        // Last page has no next link
        let last = adapter
            .list(
                Collection::BaseStations,
                &ListQuery::new().with_page(3).with_page_size(2),
            )
            .await
            .unwrap();
        assert_eq!(last.results.len(), 1);
        assert!(last.next.is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn offline_list_applies_equality_and_contains_filters() {
        let (adapter, db) = offline_adapter().await;
        seed_stations(
            &db,
            &[
                station("BS-1", "North", "Riverside East"),
                station("BS-2", "South", "Riverside West"),
                station("BS-3", "North", "Hilltop"),
            ],
        )
        .await;

        let query = ListQuery::new()
            .with_filter(Filter::eq("region", "North"))
            .with_filter(Filter::contains("name", "river"));
        let page = adapter.list(Collection::BaseStations, &query).await.unwrap();

        assert_eq!(page.count, 1);
        assert_eq!(page.results[0]["code"], "BS-1");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn offline_list_resolves_related_key_filters() {
        let (adapter, db) = offline_adapter().await;
        seed_stations(
            &db,
            &[
                station("BS-1", "North", "Alpha"),
                station("BS-2", "South", "Bravo"),
            ],
        )
        .await;
        {
            let guard = db.lock().await;
            MirrorStore::new(guard.connection())
                .upsert_batch(&[
                    transformer("TR-1", "BS-1"),
                    transformer("TR-2", "BS-2"),
                    transformer("TR-3", "BS-1"),
                ])
                .await
                .unwrap();
        }

        // Transformers whose base station sits in the North region
        let query = ListQuery::new().with_filter(Filter::related_eq(
            "station_code",
            Collection::BaseStations,
            "region",
            "North",
        ));
        let page = adapter.list(Collection::Transformers, &query).await.unwrap();

        assert_eq!(page.count, 2);
        let serials: Vec<_> = page
            .results
            .iter()
            .map(|t| t["serial_number"].as_str().unwrap())
            .collect();
        assert_eq!(serials, vec!["TR-1", "TR-3"]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn offline_get_reads_the_mirror() {
        let (adapter, db) = offline_adapter().await;
        seed_stations(&db, &[station("BS-1", "North", "Alpha")]).await;

        let found = adapter.get(Collection::BaseStations, "BS-1").await.unwrap();
        assert_eq!(found.unwrap()["name"], "Alpha");

        let missing = adapter.get(Collection::BaseStations, "BS-9").await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn online_reads_delegate_to_the_remote_api() {
        let db = shared(Database::open_in_memory().await.unwrap());
        let api = Arc::new(FakeRemoteApi::new());
        api.set_records(
            Collection::BaseStations,
            vec![json!({"code": "BS-REMOTE", "updated_at": 1})],
        );
        let (_handle, monitor) = connectivity_channel(true);
        let adapter = ReadAdapter::new(db, Arc::clone(&api), monitor);

        let query = ListQuery::new().with_filter(Filter::eq("region", "North"));
        let page = adapter.list(Collection::BaseStations, &query).await.unwrap();

        // The mirror is empty; the records came from the remote side
        assert_eq!(page.count, 1);
        assert_eq!(page.results[0]["code"], "BS-REMOTE");
        assert_eq!(api.list_calls().len(), 1);
        assert_eq!(api.list_calls()[0].1, query);

        let found = adapter
            .get(Collection::BaseStations, "BS-REMOTE")
            .await
            .unwrap();
        assert!(found.is_some());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn connectivity_transition_switches_sources_transparently() {
        let db = shared(Database::open_in_memory().await.unwrap());
        let api = Arc::new(FakeRemoteApi::new());
        api.set_records(
            Collection::BaseStations,
            vec![json!({"code": "BS-REMOTE", "updated_at": 1})],
        );
        let (handle, monitor) = connectivity_channel(true);
        let adapter = ReadAdapter::new(Arc::clone(&db), Arc::clone(&api), monitor);
        seed_stations(&db, &[station("BS-LOCAL", "North", "Alpha")]).await;

        let online = adapter
            .list(Collection::BaseStations, &ListQuery::new())
            .await
            .unwrap();
        assert_eq!(online.results[0]["code"], "BS-REMOTE");

        handle.set_connected(false);
        let offline = adapter
            .list(Collection::BaseStations, &ListQuery::new())
            .await
            .unwrap();
        assert_eq!(offline.results[0]["code"], "BS-LOCAL");
    }
}
