//! Domain models for Gridscout

mod collection;
mod feeder;
mod inspection;
mod page;
mod query;
mod queue_item;
mod station;
mod transformer;

pub use collection::Collection;
pub use feeder::Feeder;
pub use inspection::Inspection;
pub use page::Page;
pub use query::{Filter, ListQuery, DEFAULT_PAGE_SIZE};
pub use queue_item::{HttpMethod, QueueItem, QueueItemId, QueueStatus};
pub use station::BaseStation;
pub use transformer::Transformer;

use serde::de::DeserializeOwned;
use serde::Serialize;

/// A server-owned record mirrored locally for offline reads.
///
/// Mirror records are mutated only by the pull synchronizer (bulk upsert) or
/// destroyed during full-sync reconciliation.
pub trait MirrorEntity: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Collection this entity belongs to.
    const COLLECTION: Collection;

    /// Natural key, unique within the collection.
    fn natural_key(&self) -> &str;

    /// Server-supplied last-modification timestamp (Unix ms).
    fn updated_at(&self) -> i64;
}
