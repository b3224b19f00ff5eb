//! # Event Bus
//!
//! Bounded, lossy broadcast of presence events to every active subscription.
//!
//! Thin wrapper over [`tokio::sync::broadcast`]: publishing never blocks,
//! each subscription has an independent cursor, and a subscriber that falls
//! behind the shared ring loses its oldest undelivered events first. One
//! slow subscriber never stalls publishers or other subscribers.

use tokio::sync::broadcast;

use super::event::PresenceEvent;

/// Default ring capacity. Sized so drops are an overload-only edge case.
pub const DEFAULT_BUS_CAPACITY: usize = 1000;

/// Broadcast channel for presence events.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<PresenceEvent>,
}

impl EventBus {
    /// Create a bus with the given capacity (clamped to at least 1).
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publish an event to all active subscriptions.
    ///
    /// Never blocks. With no subscribers the event is dropped.
    pub fn publish(&self, event: PresenceEvent) {
        let _ = self.tx.send(event);
    }

    /// Create a subscription that observes every event published after this
    /// call returns.
    pub fn subscribe(&self) -> BusSubscription {
        BusSubscription {
            rx: self.tx.subscribe(),
            dropped: 0,
        }
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_BUS_CAPACITY)
    }
}

/// One subscriber's view of the bus.
///
/// Dropping the subscription unsubscribes; safe at any point of the
/// consumption loop.
#[derive(Debug)]
pub struct BusSubscription {
    rx: broadcast::Receiver<PresenceEvent>,
    dropped: u64,
}

impl BusSubscription {
    /// Receive the next event.
    ///
    /// If this subscriber lagged past the ring capacity, the skipped (oldest)
    /// events are counted and consumption resumes from the oldest retained
    /// event. Returns `None` once the bus is gone.
    pub async fn recv(&mut self) -> Option<PresenceEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    self.dropped += skipped;
                    tracing::debug!(skipped, "Slow subscriber dropped oldest events");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Receive without waiting. `None` when no event is buffered.
    pub fn try_recv(&mut self) -> Option<PresenceEvent> {
        loop {
            match self.rx.try_recv() {
                Ok(event) => return Some(event),
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    self.dropped += skipped;
                    tracing::debug!(skipped, "Slow subscriber dropped oldest events");
                }
                Err(broadcast::error::TryRecvError::Empty)
                | Err(broadcast::error::TryRecvError::Closed) => return None,
            }
        }
    }

    /// Total events this subscriber has lost to overload.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}
