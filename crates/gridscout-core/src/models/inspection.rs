//! Inspection mirror record

use serde::{Deserialize, Serialize};

use super::{Collection, MirrorEntity};

/// A completed field inspection, keyed by its reference string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Inspection {
    /// Inspection reference, unique within the remote system
    pub reference: String,
    /// Code of the inspected base station
    pub station_code: String,
    pub inspector: String,
    pub summary: String,
    /// Outcome as recorded by the inspector (e.g. "pass", "defect")
    pub result: String,
    /// When the inspection took place (Unix ms)
    pub inspected_at: i64,
    /// Last update timestamp supplied by the remote system (Unix ms)
    pub updated_at: i64,
}

impl MirrorEntity for Inspection {
    const COLLECTION: Collection = Collection::Inspections;

    fn natural_key(&self) -> &str {
        &self.reference
    }

    fn updated_at(&self) -> i64 {
        self.updated_at
    }
}
