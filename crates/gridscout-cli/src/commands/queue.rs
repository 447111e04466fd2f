use std::path::Path;

use gridscout_core::models::{HttpMethod, QueueItemId};

use crate::commands::common::{format_queue_lines, open_client, queue_item_to_list_item, QueueListItem};
use crate::error::CliError;

pub async fn run_queue_list(as_json: bool, db_path: &Path, offline: bool) -> Result<(), CliError> {
    let client = open_client(db_path, offline).await?;
    let items = client.queue.list_all().await?;

    if as_json {
        let json_items = items
            .iter()
            .map(queue_item_to_list_item)
            .collect::<Vec<QueueListItem>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
        return Ok(());
    }

    if items.is_empty() {
        println!("Mutation queue is empty.");
        return Ok(());
    }

    for line in format_queue_lines(&items) {
        println!("{line}");
    }
    Ok(())
}

pub async fn run_queue_add(
    endpoint: &str,
    method: HttpMethod,
    title: &str,
    payload: Option<&str>,
    db_path: &Path,
    offline: bool,
) -> Result<(), CliError> {
    let payload = match payload {
        Some(raw) => serde_json::from_str(raw)
            .map_err(|error| CliError::InvalidPayload(error.to_string()))?,
        None => serde_json::Value::Null,
    };

    let client = open_client(db_path, offline).await?;
    let item = client.queue.enqueue(endpoint, method, title, payload).await?;
    println!("Queued {} {} as {}", item.method, item.endpoint, item.id);
    Ok(())
}

pub async fn run_queue_remove(id: &str, db_path: &Path, offline: bool) -> Result<(), CliError> {
    let id = id.trim();
    if id.is_empty() {
        return Err(CliError::EmptyQueueItemId);
    }
    let item_id: QueueItemId = id
        .parse()
        .map_err(|_| CliError::InvalidQueueItemId(id.to_string()))?;

    let client = open_client(db_path, offline).await?;
    if client.queue.remove(&item_id).await? {
        println!("Discarded queued mutation {item_id}");
        Ok(())
    } else {
        Err(CliError::QueueItemNotFound(id.to_string()))
    }
}
