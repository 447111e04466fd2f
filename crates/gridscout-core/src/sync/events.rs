//! Sync lifecycle event registry
//!
//! An explicit observer registry: subscribers attach and detach freely, and
//! delivery is synchronous and in-process.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Result of one accepted sync cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    /// Whether every pull and every queued mutation succeeded
    pub success: bool,
    /// Queue items delivered this cycle
    pub success_count: usize,
    /// Queue items that failed delivery this cycle
    pub failure_count: usize,
}

/// How an accepted sync cycle ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The cycle ran to completion (possibly with per-unit failures)
    Completed(SyncReport),
    /// Connectivity was absent at the start of the cycle
    Offline,
    /// The cycle aborted on a storage-layer failure
    Failed { error: String },
}

/// Events published to the surrounding application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    SyncStarted,
    SyncEnded(SyncOutcome),
    QueueChanged,
}

type Listener = Arc<dyn Fn(&SyncEvent) + Send + Sync>;

/// Identifies a subscription for later detachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionId(u64);

/// Observer registry for sync lifecycle events.
#[derive(Default)]
pub struct SyncEvents {
    listeners: Mutex<Vec<(u64, Listener)>>,
    next_id: AtomicU64,
}

impl SyncEvents {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a listener; keep the returned id to detach it later.
    pub fn subscribe(
        &self,
        listener: impl Fn(&SyncEvent) + Send + Sync + 'static,
    ) -> SubscriptionId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.lock_listeners().push((id, Arc::new(listener)));
        SubscriptionId(id)
    }

    /// Detach a listener; returns whether it was still attached.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.lock_listeners();
        let before = listeners.len();
        listeners.retain(|(listener_id, _)| *listener_id != id.0);
        listeners.len() != before
    }

    /// Deliver an event to every attached listener, in subscription order.
    pub fn emit(&self, event: &SyncEvent) {
        // Snapshot so a listener can re-enter the registry
        let listeners: Vec<Listener> = self
            .lock_listeners()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in listeners {
            listener(event);
        }
    }

    fn lock_listeners(&self) -> std::sync::MutexGuard<'_, Vec<(u64, Listener)>> {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn multiple_listeners_each_receive_events() {
        let events = SyncEvents::new();
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));

        let first_count = Arc::clone(&first);
        events.subscribe(move |_| {
            first_count.fetch_add(1, Ordering::SeqCst);
        });
        let second_count = Arc::clone(&second);
        events.subscribe(move |_| {
            second_count.fetch_add(1, Ordering::SeqCst);
        });

        events.emit(&SyncEvent::SyncStarted);
        events.emit(&SyncEvent::QueueChanged);

        assert_eq!(first.load(Ordering::SeqCst), 2);
        assert_eq!(second.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn unsubscribed_listener_stops_receiving() {
        let events = SyncEvents::new();
        let count = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&count);
        let id = events.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        events.emit(&SyncEvent::SyncStarted);
        assert!(events.unsubscribe(id));
        events.emit(&SyncEvent::SyncStarted);

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(!events.unsubscribe(id));
    }

    #[test]
    fn events_carry_cycle_reports() {
        let events = SyncEvents::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let sink = Arc::clone(&seen);
        events.subscribe(move |event| {
            sink.lock().unwrap().push(event.clone());
        });

        let outcome = SyncOutcome::Completed(SyncReport {
            success: true,
            success_count: 2,
            failure_count: 0,
        });
        events.emit(&SyncEvent::SyncEnded(outcome.clone()));

        let seen = seen.lock().unwrap();
        assert_eq!(seen.as_slice(), &[SyncEvent::SyncEnded(outcome)]);
    }
}
