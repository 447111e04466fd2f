//! Sync orchestration
//!
//! One sync cycle is a pull of every collection (best-effort, concurrent)
//! followed by a sequential drain of the mutation queue. Cycles are
//! single-flight: a trigger while a cycle is running is a no-op, never a
//! queued re-run.

mod events;
mod pull;
mod push;
mod queue;

pub use events::{SubscriptionId, SyncEvent, SyncEvents, SyncOutcome, SyncReport};
pub use queue::MutationQueue;

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use crate::api::RemoteApi;
use crate::config::EngineConfig;
use crate::connectivity::ConnectivityMonitor;
use crate::db::{MirrorStore, SharedDatabase};
use crate::error::Result;

/// What a call to [`SyncEngine::trigger`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerOutcome {
    /// A cycle ran (or was cut short by missing connectivity)
    Ran(SyncOutcome),
    /// A cycle was already running; nothing happened
    AlreadySyncing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CyclePhase {
    Idle,
    Syncing,
}

/// Coordinates pull and push into guarded sync cycles.
///
/// Owns the single-flight state explicitly; there is no module-level
/// singleton. Cycles are started by connectivity transitions, the periodic
/// timer, or an explicit [`SyncEngine::trigger`] call.
pub struct SyncEngine<A: RemoteApi> {
    db: SharedDatabase,
    api: Arc<A>,
    connectivity: ConnectivityMonitor,
    events: Arc<SyncEvents>,
    phase: Mutex<CyclePhase>,
    sync_interval: Duration,
}

impl<A: RemoteApi> SyncEngine<A> {
    pub fn new(
        db: SharedDatabase,
        api: Arc<A>,
        connectivity: ConnectivityMonitor,
        config: &EngineConfig,
    ) -> Self {
        Self {
            db,
            api,
            connectivity,
            events: Arc::new(SyncEvents::new()),
            phase: Mutex::new(CyclePhase::Idle),
            sync_interval: config.sync_interval,
        }
    }

    /// The engine's event registry, for subscribing to lifecycle events.
    pub fn events(&self) -> &Arc<SyncEvents> {
        &self.events
    }

    /// The mutation queue sharing this engine's storage and events.
    pub fn queue(&self) -> MutationQueue {
        MutationQueue::new(Arc::clone(&self.db), Arc::clone(&self.events))
    }

    /// Run one sync cycle unless one is already running.
    ///
    /// `SyncStarted` and exactly one `SyncEnded` are emitted per accepted
    /// trigger; an ignored trigger emits nothing.
    pub async fn trigger(&self) -> TriggerOutcome {
        let Some(guard) = PhaseGuard::try_begin(&self.phase) else {
            tracing::debug!("Sync already running; trigger ignored");
            return TriggerOutcome::AlreadySyncing;
        };

        self.events.emit(&SyncEvent::SyncStarted);
        let outcome = self.run_cycle().await;
        self.events.emit(&SyncEvent::SyncEnded(outcome.clone()));
        drop(guard);

        TriggerOutcome::Ran(outcome)
    }

    async fn run_cycle(&self) -> SyncOutcome {
        if !self.connectivity.is_connected() {
            tracing::debug!("Sync skipped: offline");
            return SyncOutcome::Offline;
        }

        let pull_failures = pull::pull_all(&self.db, self.api.as_ref()).await;

        match push::drain_queue(&self.db, self.api.as_ref(), &self.events).await {
            Ok(report) => {
                let outcome = SyncReport {
                    success: pull_failures == 0 && report.failed == 0,
                    success_count: report.delivered,
                    failure_count: report.failed,
                };
                tracing::info!(
                    "Sync cycle finished: {} delivered, {} failed, {} collections unreachable",
                    outcome.success_count,
                    outcome.failure_count,
                    pull_failures
                );
                SyncOutcome::Completed(outcome)
            }
            Err(error) => {
                tracing::error!("Sync cycle aborted: {error}");
                SyncOutcome::Failed {
                    error: error.to_string(),
                }
            }
        }
    }

    /// Drop every pull watermark so the next cycle performs full pulls,
    /// reconciling deletions (manual recovery path).
    pub async fn clear_watermarks(&self) -> Result<()> {
        let db = self.db.lock().await;
        MirrorStore::new(db.connection()).clear_watermarks().await
    }

    /// When the last queue drain finished (Unix ms), if ever.
    pub async fn last_sync_time(&self) -> Result<Option<i64>> {
        let db = self.db.lock().await;
        MirrorStore::new(db.connection()).last_sync_time().await
    }

    /// Drive the automatic triggers until the task is aborted.
    ///
    /// Fires a cycle on every disconnected-to-connected transition and on
    /// the configured interval. Spawn this on the runtime; explicit
    /// [`SyncEngine::trigger`] calls remain available alongside it.
    pub async fn run_scheduler(self: Arc<Self>) {
        let mut ticker = tokio::time::interval(self.sync_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick resolves immediately; scheduling starts one
        // interval from now
        ticker.tick().await;

        let mut connectivity = self.connectivity.clone();
        let mut watch_alive = true;
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.trigger().await;
                }
                reconnected = connectivity.reconnected(), if watch_alive => {
                    if reconnected {
                        self.trigger().await;
                    } else {
                        // Host side dropped; periodic ticks keep running
                        watch_alive = false;
                    }
                }
            }
        }
    }
}

/// RAII guard for the single-flight phase.
///
/// Restores `Idle` on drop, so the engine returns to idle on every exit
/// path including panics.
struct PhaseGuard<'a> {
    phase: &'a Mutex<CyclePhase>,
}

impl<'a> PhaseGuard<'a> {
    fn try_begin(phase: &'a Mutex<CyclePhase>) -> Option<Self> {
        let mut state = phase.lock().unwrap_or_else(PoisonError::into_inner);
        if *state == CyclePhase::Syncing {
            return None;
        }
        *state = CyclePhase::Syncing;
        Some(Self { phase })
    }
}

impl Drop for PhaseGuard<'_> {
    fn drop(&mut self) {
        *self.phase.lock().unwrap_or_else(PoisonError::into_inner) = CyclePhase::Idle;
    }
}
