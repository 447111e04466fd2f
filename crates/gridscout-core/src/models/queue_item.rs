//! Mutation queue item model

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Error;
use crate::util::unix_millis_now;

/// A unique identifier for a queue item, using UUID v7 (time-sortable)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueueItemId(Uuid);

impl QueueItemId {
    /// Create a new unique queue item ID using UUID v7
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Get the string representation of this ID
    #[must_use]
    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl Default for QueueItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for QueueItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for QueueItemId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// HTTP method of a queued mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    /// Wire representation of the method
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "PATCH" => Ok(Self::Patch),
            "DELETE" => Ok(Self::Delete),
            other => Err(Error::InvalidInput(format!("Unknown HTTP method: {other}"))),
        }
    }
}

/// Delivery status of a queue item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueStatus {
    Pending,
    Processing,
    Failed,
}

impl QueueStatus {
    /// Stored representation of the status
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Failed => "failed",
        }
    }
}

impl FromStr for QueueStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "failed" => Ok(Self::Failed),
            other => Err(Error::InvalidInput(format!(
                "Unknown queue status: {other}"
            ))),
        }
    }
}

/// A not-yet-acknowledged write operation awaiting remote delivery.
///
/// Items are removed only by successful delivery or explicit user deletion,
/// never silently dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueItem {
    pub id: QueueItemId,
    /// Remote resource endpoint the mutation targets
    pub endpoint: String,
    pub method: HttpMethod,
    /// Human label shown when inspecting the queue
    pub title: String,
    /// Opaque entity-specific payload; round-trips storage unchanged
    pub payload: serde_json::Value,
    /// When the item was enqueued (Unix ms); replay order is ascending
    pub enqueued_at: i64,
    pub status: QueueStatus,
    /// Newline-joined history of delivery errors
    pub error: Option<String>,
    pub retry_count: u32,
}

impl QueueItem {
    /// Create a pending item with a fresh id and the current timestamp.
    #[must_use]
    pub fn new(
        endpoint: impl Into<String>,
        method: HttpMethod,
        title: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            id: QueueItemId::new(),
            endpoint: endpoint.into(),
            method,
            title: title.into(),
            payload,
            enqueued_at: unix_millis_now(),
            status: QueueStatus::Pending,
            error: None,
            retry_count: 0,
        }
    }

    /// Whether this item is eligible for the next drain pass.
    #[must_use]
    pub const fn is_drainable(&self) -> bool {
        matches!(self.status, QueueStatus::Pending | QueueStatus::Failed)
    }
}
