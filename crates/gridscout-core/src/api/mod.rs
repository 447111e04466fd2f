//! Remote API client
//!
//! The engine only ever sees the [`RemoteApi`] trait; the reqwest-backed
//! [`HttpRemoteApi`] is the production implementation. Tests substitute an
//! in-memory fake so no test touches the network.

#[cfg(test)]
pub mod fake;

use reqwest::StatusCode;

use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::models::{Collection, Filter, HttpMethod, ListQuery, Page};
use crate::util::compact_text;

/// Client-side view of the remote system.
#[allow(async_fn_in_trait)]
pub trait RemoteApi {
    /// Fetch one page of a collection, optionally restricted to records
    /// changed since the given timestamp (Unix ms). Pages are 1-based.
    async fn fetch_changed(
        &self,
        collection: Collection,
        updated_since: Option<i64>,
        page: u64,
    ) -> Result<Page<serde_json::Value>>;

    /// List a collection with the caller's filters and pagination.
    async fn list(&self, collection: Collection, query: &ListQuery)
        -> Result<Page<serde_json::Value>>;

    /// Fetch a single record by natural key; `None` when the remote system
    /// reports it missing.
    async fn get(&self, collection: Collection, key: &str) -> Result<Option<serde_json::Value>>;

    /// Replay one queued mutation. Any 2xx response is success; a non-2xx
    /// response surfaces as [`Error::Remote`] carrying the serialized body,
    /// and a request that never got a response as [`Error::Transport`].
    async fn execute(
        &self,
        method: HttpMethod,
        endpoint: &str,
        payload: &serde_json::Value,
    ) -> Result<()>;
}

/// reqwest-backed [`RemoteApi`] implementation.
#[derive(Clone)]
pub struct HttpRemoteApi {
    base_url: String,
    page_size: u64,
    client: reqwest::Client,
}

impl HttpRemoteApi {
    /// Build a client for the configured remote system.
    pub fn new(config: &EngineConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self {
            base_url: config.api_base_url.clone(),
            page_size: config.page_size,
            client,
        })
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{endpoint}", self.base_url)
    }
}

impl RemoteApi for HttpRemoteApi {
    async fn fetch_changed(
        &self,
        collection: Collection,
        updated_since: Option<i64>,
        page: u64,
    ) -> Result<Page<serde_json::Value>> {
        let params = changed_since_params(updated_since, page, self.page_size);
        let response = self
            .client
            .get(self.url(collection.endpoint()))
            .query(&params)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(remote_error(response.status(), &read_body(response).await));
        }
        Ok(response.json::<Page<serde_json::Value>>().await?)
    }

    async fn list(
        &self,
        collection: Collection,
        query: &ListQuery,
    ) -> Result<Page<serde_json::Value>> {
        let params = list_params(query);
        let response = self
            .client
            .get(self.url(collection.endpoint()))
            .query(&params)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(remote_error(response.status(), &read_body(response).await));
        }
        Ok(response.json::<Page<serde_json::Value>>().await?)
    }

    async fn get(&self, collection: Collection, key: &str) -> Result<Option<serde_json::Value>> {
        let response = self
            .client
            .get(self.url(&format!("{}{key}/", collection.endpoint())))
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(remote_error(response.status(), &read_body(response).await));
        }
        Ok(Some(response.json::<serde_json::Value>().await?))
    }

    async fn execute(
        &self,
        method: HttpMethod,
        endpoint: &str,
        payload: &serde_json::Value,
    ) -> Result<()> {
        let mut request = self
            .client
            .request(request_method(method), self.url(endpoint))
            .header(reqwest::header::ACCEPT, "application/json");

        // DELETE mutations carry no body
        if !payload.is_null() {
            request = request.json(payload);
        }

        let response = request.send().await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(remote_error(response.status(), &read_body(response).await))
        }
    }
}

const fn request_method(method: HttpMethod) -> reqwest::Method {
    match method {
        HttpMethod::Post => reqwest::Method::POST,
        HttpMethod::Put => reqwest::Method::PUT,
        HttpMethod::Patch => reqwest::Method::PATCH,
        HttpMethod::Delete => reqwest::Method::DELETE,
    }
}

async fn read_body(response: reqwest::Response) -> String {
    response.text().await.unwrap_or_default()
}

/// Build the stored representation of a remote rejection.
///
/// The body is kept verbatim (compacted) so the queue records exactly what
/// the server said; an empty body falls back to the bare status line.
fn remote_error(status: StatusCode, body: &str) -> Error {
    let trimmed = body.trim();
    let body = if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        compact_text(trimmed)
    };
    Error::Remote {
        status: status.as_u16(),
        body,
    }
}

fn changed_since_params(updated_since: Option<i64>, page: u64, page_size: u64) -> Vec<(String, String)> {
    let mut params = Vec::with_capacity(3);
    if let Some(since) = updated_since {
        params.push(("updated_since".to_string(), since.to_string()));
    }
    params.push(("page".to_string(), page.to_string()));
    params.push(("page_size".to_string(), page_size.to_string()));
    params
}

fn list_params(query: &ListQuery) -> Vec<(String, String)> {
    let mut params = Vec::new();
    for filter in &query.filters {
        match filter {
            Filter::Eq { field, value } => {
                params.push((field.clone(), value.clone()));
            }
            Filter::Contains { field, value } => {
                params.push((format!("{field}__icontains"), value.clone()));
            }
            Filter::RelatedEq {
                key_field,
                field,
                value,
                ..
            } => {
                params.push((format!("{key_field}__{field}"), value.clone()));
            }
        }
    }
    params.push(("page".to_string(), query.page.to_string()));
    params.push(("page_size".to_string(), query.page_size.to_string()));
    params
}
