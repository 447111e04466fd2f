//! Low-voltage feeder mirror record

use serde::{Deserialize, Serialize};

use super::{Collection, MirrorEntity};

/// A low-voltage feeder line, keyed by feeder code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feeder {
    /// Feeder code, unique within the remote system
    pub code: String,
    /// Serial number of the transformer this feeder is connected to
    pub transformer_serial: String,
    pub conductor: String,
    pub length_m: f64,
    pub status: String,
    /// Last update timestamp supplied by the remote system (Unix ms)
    pub updated_at: i64,
}

impl MirrorEntity for Feeder {
    const COLLECTION: Collection = Collection::Feeders;

    fn natural_key(&self) -> &str {
        &self.code
    }

    fn updated_at(&self) -> i64 {
        self.updated_at
    }
}
