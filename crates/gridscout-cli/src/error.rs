use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] gridscout_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Queue item id cannot be empty")]
    EmptyQueueItemId,
    #[error("Queue item not found: {0}")]
    QueueItemNotFound(String),
    #[error("Invalid queue item id: {0}")]
    InvalidQueueItemId(String),
    #[error("Payload is not valid JSON: {0}")]
    InvalidPayload(String),
    #[error("Unsupported filter: {0}")]
    UnsupportedFilter(String),
    #[error(
        "Remote API is not configured. Set GRIDSCOUT_API_URL to the base URL of the asset registry."
    )]
    ApiNotConfigured,
    #[error("Configuration error: {0}")]
    Config(String),
}
