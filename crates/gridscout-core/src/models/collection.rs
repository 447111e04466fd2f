//! Mirrored entity collection descriptors

use std::fmt;

/// A named set of same-shaped records mirrored locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    BaseStations,
    Transformers,
    Inspections,
    Feeders,
}

impl Collection {
    /// Every collection the pull synchronizer mirrors, in pull order.
    pub const ALL: [Self; 4] = [
        Self::BaseStations,
        Self::Transformers,
        Self::Inspections,
        Self::Feeders,
    ];

    /// Local mirror table name.
    pub const fn table(self) -> &'static str {
        match self {
            Self::BaseStations => "basestations",
            Self::Transformers => "transformers",
            Self::Inspections => "inspections",
            Self::Feeders => "feeders",
        }
    }

    /// Remote list endpoint for this collection.
    pub const fn endpoint(self) -> &'static str {
        match self {
            Self::BaseStations => "/basestations/",
            Self::Transformers => "/transformers/",
            Self::Inspections => "/inspections/",
            Self::Feeders => "/feeders/",
        }
    }

    /// `sync_meta` key holding this collection's pull watermark.
    pub fn watermark_key(self) -> String {
        format!("{}_last_updated_at", self.table())
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table())
    }
}
