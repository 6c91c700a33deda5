//! Network reachability monitoring
//!
//! Connectivity is an injected collaborator: platform glue (or a test) feeds
//! transitions into a monitor, and the sync engine both polls the current
//! status and subscribes to transitions to schedule reconnect drains.

use tokio::sync::watch;

/// Current reachability as reported by the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkStatus {
    /// Whether a network interface is up
    pub is_connected: bool,
    /// Whether the wider internet is actually reachable over it
    pub is_internet_reachable: bool,
}

impl NetworkStatus {
    /// A fully reachable status
    #[must_use]
    pub const fn online() -> Self {
        Self {
            is_connected: true,
            is_internet_reachable: true,
        }
    }

    /// A fully unreachable status
    #[must_use]
    pub const fn offline() -> Self {
        Self {
            is_connected: false,
            is_internet_reachable: false,
        }
    }

    /// The single authoritative boolean the engine keys on
    #[must_use]
    pub const fn is_online(self) -> bool {
        self.is_connected && self.is_internet_reachable
    }
}

/// Capability interface for connectivity observation
pub trait NetworkMonitor {
    /// Current reachability
    fn current_status(&self) -> NetworkStatus;

    /// Receive status transitions; dropping the receiver unsubscribes
    fn subscribe(&self) -> watch::Receiver<NetworkStatus>;
}

/// Monitor fed by platform glue through [`WatchNetworkMonitor::set_status`].
///
/// Constructed once at process start and handed to the engine by reference,
/// avoiding hidden global mutable state while preserving single-instance
/// lifecycle.
#[derive(Clone)]
pub struct WatchNetworkMonitor {
    tx: watch::Sender<NetworkStatus>,
}

impl WatchNetworkMonitor {
    /// Create a monitor with the given initial status
    #[must_use]
    pub fn new(initial: NetworkStatus) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx }
    }

    /// Publish a status transition to all subscribers
    pub fn set_status(&self, status: NetworkStatus) {
        if *self.tx.borrow() != status {
            tracing::debug!(
                "Network status changed: online={} -> online={}",
                self.tx.borrow().is_online(),
                status.is_online()
            );
        }
        // send_replace never fails; the sender keeps the channel alive.
        let _ = self.tx.send_replace(status);
    }
}

impl Default for WatchNetworkMonitor {
    fn default() -> Self {
        Self::new(NetworkStatus::offline())
    }
}

impl NetworkMonitor for WatchNetworkMonitor {
    fn current_status(&self) -> NetworkStatus {
        *self.tx.borrow()
    }

    fn subscribe(&self) -> watch::Receiver<NetworkStatus> {
        self.tx.subscribe()
    }
}
