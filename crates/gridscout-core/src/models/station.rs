//! Base station mirror record

use serde::{Deserialize, Serialize};

use super::{Collection, MirrorEntity};

/// A distribution base station, keyed by station code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaseStation {
    /// Station code, unique within the remote system
    pub code: String,
    pub name: String,
    pub region: String,
    pub district: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Operational status as reported by the remote system
    pub status: String,
    /// Last update timestamp supplied by the remote system (Unix ms)
    pub updated_at: i64,
}

impl MirrorEntity for BaseStation {
    const COLLECTION: Collection = Collection::BaseStations;

    fn natural_key(&self) -> &str {
        &self.code
    }

    fn updated_at(&self) -> i64 {
        self.updated_at
    }
}
