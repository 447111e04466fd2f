//! Paginated list envelope shared by the remote contract and offline reads

use serde::{Deserialize, Serialize};

/// The remote system's pagination envelope.
///
/// Offline reads emulate the same shape so the application layer cannot tell
/// which side served a list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    /// Total number of records matching the query (not just this page)
    pub count: u64,
    /// Link to the next page, absent on the last page
    pub next: Option<String>,
    /// Link to the previous page, absent on the first page
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    /// An empty first-and-last page.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            count: 0,
            next: None,
            previous: None,
            results: Vec::new(),
        }
    }

    /// Whether this is the final page of the result set.
    #[must_use]
    pub const fn is_last(&self) -> bool {
        self.next.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_page_is_last() {
        let page: Page<serde_json::Value> = Page::empty();
        assert!(page.is_last());
        assert_eq!(page.count, 0);
    }

    #[test]
    fn deserializes_remote_envelope() {
        let payload = r#"{
            "count": 3,
            "next": "/basestations/?page=2&page_size=2",
            "previous": null,
            "results": [{"code": "BS-1"}, {"code": "BS-2"}]
        }"#;

        let page: Page<serde_json::Value> = serde_json::from_str(payload).unwrap();
        assert_eq!(page.count, 3);
        assert_eq!(page.results.len(), 2);
        assert!(!page.is_last());
    }
}
