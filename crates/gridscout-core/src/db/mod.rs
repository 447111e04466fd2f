//! Database layer for Gridscout

mod connection;
mod migrations;
mod mirror;
mod queue;

pub use connection::{Database, WriteBlock};
pub use mirror::MirrorStore;
pub use queue::QueueRepository;

use std::sync::Arc;
use tokio::sync::Mutex;

/// Shared handle to the single local database.
///
/// The store serializes writers through its write blocks; the async mutex
/// keeps repository construction race-free across tasks.
pub type SharedDatabase = Arc<Mutex<Database>>;

/// Wrap a database in the shared handle used across the engine.
pub fn shared(db: Database) -> SharedDatabase {
    Arc::new(Mutex::new(db))
}
