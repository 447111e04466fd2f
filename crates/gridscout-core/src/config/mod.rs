//! Engine configuration
//!
//! Holds the public endpoints and tuning knobs the sync engine needs. Secret
//! credentials never live here.

use std::time::Duration;

use crate::error::{Error, Result};
use crate::models::DEFAULT_PAGE_SIZE;
use crate::util::{is_http_url, normalize_text_option};

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;
const DEFAULT_SYNC_INTERVAL_SECS: u64 = 300;

/// Configuration for the sync engine and remote API client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Base URL of the remote system (scheme required, no trailing slash)
    pub api_base_url: String,
    /// Caller-side timeout applied to every remote call; on expiry the call
    /// is treated as a transport failure
    pub request_timeout: Duration,
    /// Period of the automatic sync trigger
    pub sync_interval: Duration,
    /// Page size requested from the remote system during pulls
    pub page_size: u64,
}

impl EngineConfig {
    /// Create a configuration for the given API base URL.
    ///
    /// The URL is trimmed, must carry an `http://` or `https://` scheme, and
    /// loses any trailing slash.
    pub fn new(api_base_url: impl Into<String>) -> Result<Self> {
        let api_base_url = normalize_base_url(api_base_url.into())?;
        Ok(Self {
            api_base_url,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            sync_interval: Duration::from_secs(DEFAULT_SYNC_INTERVAL_SECS),
            page_size: DEFAULT_PAGE_SIZE,
        })
    }

    /// Set the per-request timeout
    #[must_use]
    pub const fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the periodic sync interval
    #[must_use]
    pub const fn with_sync_interval(mut self, interval: Duration) -> Self {
        self.sync_interval = interval;
        self
    }

    /// Set the pull page size
    #[must_use]
    pub const fn with_page_size(mut self, page_size: u64) -> Self {
        self.page_size = page_size;
        self
    }
}

fn normalize_base_url(raw: String) -> Result<String> {
    let url = normalize_text_option(Some(raw))
        .ok_or_else(|| Error::InvalidInput("API base URL must not be empty".to_string()))?;
    if is_http_url(&url) {
        Ok(url.trim_end_matches('/').to_string())
    } else {
        Err(Error::InvalidInput(
            "API base URL must include http:// or https://".to_string(),
        ))
    }
}
