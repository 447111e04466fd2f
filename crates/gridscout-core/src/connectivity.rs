//! Connectivity signal consumed from the host platform.
//!
//! The host owns a [`ConnectivityHandle`] and pushes transitions into it;
//! the engine and read adapter observe through cloned
//! [`ConnectivityMonitor`]s.

use tokio::sync::watch;

/// Create the connectivity observable with its initial state.
pub fn connectivity_channel(initially_connected: bool) -> (ConnectivityHandle, ConnectivityMonitor) {
    let (tx, rx) = watch::channel(initially_connected);
    (ConnectivityHandle { tx }, ConnectivityMonitor { rx })
}

/// Host-side sender for connectivity transitions.
pub struct ConnectivityHandle {
    tx: watch::Sender<bool>,
}

impl ConnectivityHandle {
    /// Publish the current reachability of the remote system.
    pub fn set_connected(&self, connected: bool) {
        let changed = self.tx.send_if_modified(|current| {
            if *current == connected {
                false
            } else {
                *current = connected;
                true
            }
        });
        if changed {
            if connected {
                tracing::info!("Connectivity restored");
            } else {
                tracing::warn!("Connectivity lost");
            }
        }
    }
}

/// Read side of the connectivity observable.
#[derive(Clone)]
pub struct ConnectivityMonitor {
    rx: watch::Receiver<bool>,
}

impl ConnectivityMonitor {
    /// Current connectivity, as last reported by the host.
    pub fn is_connected(&self) -> bool {
        *self.rx.borrow()
    }

    /// Wait for a disconnected-to-connected transition.
    ///
    /// Returns `false` when the host side has gone away and no further
    /// transitions can arrive.
    pub async fn reconnected(&mut self) -> bool {
        loop {
            let was_connected = *self.rx.borrow_and_update();
            if self.rx.changed().await.is_err() {
                return false;
            }
            let now_connected = *self.rx.borrow();
            if !was_connected && now_connected {
                return true;
            }
        }
    }
}
