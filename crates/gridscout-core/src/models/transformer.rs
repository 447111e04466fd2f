//! Transformer mirror record

use serde::{Deserialize, Serialize};

use super::{Collection, MirrorEntity};

/// A distribution transformer, keyed by serial number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transformer {
    /// Serial number, unique within the remote system
    pub serial_number: String,
    /// Code of the base station this transformer belongs to
    pub station_code: String,
    pub model: String,
    pub rated_kva: f64,
    pub status: String,
    /// Last update timestamp supplied by the remote system (Unix ms)
    pub updated_at: i64,
}

impl MirrorEntity for Transformer {
    const COLLECTION: Collection = Collection::Transformers;

    fn natural_key(&self) -> &str {
        &self.serial_number
    }

    fn updated_at(&self) -> i64 {
        self.updated_at
    }
}
