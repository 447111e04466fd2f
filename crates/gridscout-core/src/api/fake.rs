//! In-memory [`RemoteApi`] fake used by engine tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use serde_json::Value;

use super::RemoteApi;
use crate::error::{Error, Result};
use crate::models::{Collection, HttpMethod, ListQuery, Page};

/// Scripted outcome for a mutation replay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FakeResponse {
    /// Any 2xx
    Success,
    /// Non-2xx with a body
    Reject { status: u16, body: String },
    /// Request never got a response
    TransportFailure,
}

/// A fake remote system: server-side collection state plus scripted mutation
/// outcomes, with every call recorded for assertions.
#[derive(Default)]
pub struct FakeRemoteApi {
    records: Mutex<HashMap<Collection, Vec<Value>>>,
    unreachable: Mutex<HashSet<Collection>>,
    responses: Mutex<HashMap<String, FakeResponse>>,
    executed: Mutex<Vec<(HttpMethod, String, Value)>>,
    list_calls: Mutex<Vec<(Collection, ListQuery)>>,
    execute_delay: Mutex<Option<std::time::Duration>>,
    page_size: u64,
}

impl FakeRemoteApi {
    pub fn new() -> Self {
        Self {
            page_size: 1000,
            ..Self::default()
        }
    }

    /// Use a small page size to exercise pull pagination.
    pub fn with_page_size(mut self, page_size: u64) -> Self {
        self.page_size = page_size;
        self
    }

    /// Replace the server-side state of a collection.
    pub fn set_records(&self, collection: Collection, records: Vec<Value>) {
        self.records.lock().unwrap().insert(collection, records);
    }

    /// Make every pull of this collection fail at the transport level.
    pub fn make_unreachable(&self, collection: Collection) {
        self.unreachable.lock().unwrap().insert(collection);
    }

    /// Script the outcome of a mutation replay against an endpoint.
    pub fn script(&self, method: HttpMethod, endpoint: &str, response: FakeResponse) {
        self.responses
            .lock()
            .unwrap()
            .insert(call_key(method, endpoint), response);
    }

    /// Endpoints of every replayed mutation, in call order.
    pub fn executed_endpoints(&self) -> Vec<String> {
        self.executed
            .lock()
            .unwrap()
            .iter()
            .map(|(_, endpoint, _)| endpoint.clone())
            .collect()
    }

    /// Number of mutation replays attempted.
    pub fn executed_count(&self) -> usize {
        self.executed.lock().unwrap().len()
    }

    /// Queries passed to `list`, in call order.
    pub fn list_calls(&self) -> Vec<(Collection, ListQuery)> {
        self.list_calls.lock().unwrap().clone()
    }

    /// Slow down mutation replays, e.g. to hold a sync cycle open.
    pub fn set_execute_delay(&self, delay: std::time::Duration) {
        *self.execute_delay.lock().unwrap() = Some(delay);
    }
}

impl RemoteApi for FakeRemoteApi {
    async fn fetch_changed(
        &self,
        collection: Collection,
        updated_since: Option<i64>,
        page: u64,
    ) -> Result<Page<Value>> {
        if self.unreachable.lock().unwrap().contains(&collection) {
            return Err(Error::Transport("connection refused".to_string()));
        }

        let records = self.records.lock().unwrap();
        let matched: Vec<Value> = records
            .get(&collection)
            .map(|all| {
                all.iter()
                    .filter(|record| {
                        updated_since.is_none_or(|since| {
                            record.get("updated_at").and_then(Value::as_i64).unwrap_or(0) > since
                        })
                    })
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        let count = matched.len() as u64;
        let offset = usize::try_from((page - 1) * self.page_size).unwrap_or(usize::MAX);
        let results: Vec<Value> = matched
            .into_iter()
            .skip(offset)
            .take(usize::try_from(self.page_size).unwrap_or(usize::MAX))
            .collect();
        let has_more = offset as u64 + (results.len() as u64) < count;

        Ok(Page {
            count,
            next: has_more.then(|| format!("page={}", page + 1)),
            previous: (page > 1).then(|| format!("page={}", page - 1)),
            results,
        })
    }

    async fn list(&self, collection: Collection, query: &ListQuery) -> Result<Page<Value>> {
        self.list_calls
            .lock()
            .unwrap()
            .push((collection, query.clone()));

        let records = self.records.lock().unwrap();
        let all = records.get(&collection).cloned().unwrap_or_default();
        Ok(Page {
            count: all.len() as u64,
            next: None,
            previous: None,
            results: all,
        })
    }

    async fn get(&self, collection: Collection, key: &str) -> Result<Option<Value>> {
        let key_field = match collection {
            Collection::BaseStations | Collection::Feeders => "code",
            Collection::Transformers => "serial_number",
            Collection::Inspections => "reference",
        };
        let records = self.records.lock().unwrap();
        Ok(records.get(&collection).and_then(|all| {
            all.iter()
                .find(|record| record.get(key_field).and_then(Value::as_str) == Some(key))
                .cloned()
        }))
    }

    async fn execute(
        &self,
        method: HttpMethod,
        endpoint: &str,
        payload: &Value,
    ) -> Result<()> {
        let delay = *self.execute_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.executed
            .lock()
            .unwrap()
            .push((method, endpoint.to_string(), payload.clone()));

        let response = self
            .responses
            .lock()
            .unwrap()
            .get(&call_key(method, endpoint))
            .cloned()
            .unwrap_or(FakeResponse::Success);

        match response {
            FakeResponse::Success => Ok(()),
            FakeResponse::Reject { status, body } => Err(Error::Remote { status, body }),
            FakeResponse::TransportFailure => {
                Err(Error::Transport("connection reset".to_string()))
            }
        }
    }
}

fn call_key(method: HttpMethod, endpoint: &str) -> String {
    format!("{method} {endpoint}")
}
