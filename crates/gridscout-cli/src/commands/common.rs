use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use gridscout_core::api::HttpRemoteApi;
use gridscout_core::connectivity::{connectivity_channel, ConnectivityHandle};
use gridscout_core::db::{shared, Database};
use gridscout_core::models::QueueItem;
use gridscout_core::read::ReadAdapter;
use gridscout_core::sync::MutationQueue;
use gridscout_core::{EngineConfig, SyncEngine};
use serde::Serialize;

use crate::error::CliError;

/// Everything a command needs, wired to one local database.
pub struct FieldClient {
    pub engine: Arc<SyncEngine<HttpRemoteApi>>,
    pub queue: MutationQueue,
    pub adapter: ReadAdapter<HttpRemoteApi>,
    // Keeps the connectivity observable alive for the process lifetime
    _connectivity: ConnectivityHandle,
}

/// Open the local database and construct the engine stack.
///
/// `--offline` pins the connectivity signal to disconnected; a terminal
/// process has no platform reachability callback to subscribe to.
pub async fn open_client(db_path: &Path, offline: bool) -> Result<FieldClient, CliError> {
    let config = engine_config_from_env()?;
    let api = Arc::new(HttpRemoteApi::new(&config)?);

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let db = shared(Database::open(db_path).await?);

    let (handle, monitor) = connectivity_channel(!offline);
    let engine = Arc::new(SyncEngine::new(
        Arc::clone(&db),
        Arc::clone(&api),
        monitor.clone(),
        &config,
    ));
    let queue = engine.queue();
    let adapter = ReadAdapter::new(db, api, monitor);

    Ok(FieldClient {
        engine,
        queue,
        adapter,
        _connectivity: handle,
    })
}

/// Resolve the database path: flag, then env, then the platform data dir.
pub fn resolve_db_path(cli_path: Option<PathBuf>) -> PathBuf {
    if let Some(path) = cli_path {
        return path;
    }
    if let Ok(path) = env::var("GRIDSCOUT_DB_PATH") {
        let path = path.trim();
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }
    dirs::data_local_dir()
        .or_else(dirs::data_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("gridscout")
        .join("gridscout.db")
}

/// Build the engine configuration from the environment.
pub fn engine_config_from_env() -> Result<EngineConfig, CliError> {
    let base_url = env::var("GRIDSCOUT_API_URL")
        .ok()
        .map(|url| url.trim().to_string())
        .filter(|url| !url.is_empty())
        .ok_or(CliError::ApiNotConfigured)?;

    let mut config = EngineConfig::new(base_url)
        .map_err(|error| CliError::Config(error.to_string()))?;

    if let Some(secs) = env_u64("GRIDSCOUT_REQUEST_TIMEOUT_SECS")? {
        config = config.with_request_timeout(Duration::from_secs(secs));
    }
    if let Some(secs) = env_u64("GRIDSCOUT_SYNC_INTERVAL_SECS")? {
        config = config.with_sync_interval(Duration::from_secs(secs));
    }
    if let Some(page_size) = env_u64("GRIDSCOUT_PAGE_SIZE")? {
        config = config.with_page_size(page_size);
    }

    Ok(config)
}

fn env_u64(name: &str) -> Result<Option<u64>, CliError> {
    match env::var(name) {
        Ok(raw) => {
            let raw = raw.trim();
            if raw.is_empty() {
                return Ok(None);
            }
            raw.parse()
                .map(Some)
                .map_err(|_| CliError::Config(format!("{name} must be a positive integer")))
        }
        Err(_) => Ok(None),
    }
}

#[derive(Debug, Serialize)]
pub struct QueueListItem {
    pub id: String,
    pub endpoint: String,
    pub method: String,
    pub title: String,
    pub enqueued_at: i64,
    pub enqueued_at_iso: String,
    pub status: String,
    pub retry_count: u32,
    pub error: Option<String>,
}

pub fn queue_item_to_list_item(item: &QueueItem) -> QueueListItem {
    QueueListItem {
        id: item.id.to_string(),
        endpoint: item.endpoint.clone(),
        method: item.method.to_string(),
        title: item.title.clone(),
        enqueued_at: item.enqueued_at,
        enqueued_at_iso: format_millis(item.enqueued_at),
        status: item.status.as_str().to_string(),
        retry_count: item.retry_count,
        error: item.error.clone(),
    }
}

pub fn format_queue_lines(items: &[QueueItem]) -> Vec<String> {
    let mut lines = Vec::new();
    for item in items {
        lines.push(format!(
            "{}  {:<6} {:<28} {:<10} retries={}  {}",
            item.id,
            item.method,
            item.endpoint,
            item.status.as_str(),
            item.retry_count,
            item.title,
        ));
        if let Some(error) = &item.error {
            for line in error.lines() {
                lines.push(format!("    ! {line}"));
            }
        }
    }
    lines
}

/// Unix ms to RFC 3339, best-effort.
pub fn format_millis(millis: i64) -> String {
    chrono::DateTime::from_timestamp_millis(millis)
        .map_or_else(|| millis.to_string(), |when| when.to_rfc3339())
}
