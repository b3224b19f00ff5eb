//! # Subscription Session
//!
//! Per-connection state machine: `Replaying → Live → Closed`.
//!
//! ## Invariant: subscribe before register
//! [`SubscriptionSession::open`] subscribes to the event bus *before* it
//! touches the registry. A peer registration racing this session is then
//! either in the pre-registration snapshot or captured by the already-live
//! bus subscription; reversing the order reintroduces a window in which the
//! peer is missing from both. At worst an event published between snapshot
//! and the first live read shows up after the replayed roster as a
//! duplicate-looking join, which consumers re-apply idempotently.

use std::collections::VecDeque;
use std::sync::Arc;

use super::bus::BusSubscription;
use super::errors::PresenceResult;
use super::event::{ClientId, ClientInfo, PresenceEvent};
use super::registry::ClientRegistry;

/// Phase of a subscription session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Draining the synthesized snapshot (`connected` + one `user_joined`
    /// per pre-existing peer).
    Replaying,
    /// Forwarding live bus events.
    Live,
    /// Terminal; teardown has run.
    Closed,
}

/// Server-side state for one client's subscribed connection.
#[derive(Debug)]
pub struct SubscriptionSession {
    registry: Arc<ClientRegistry>,
    client_id: ClientId,
    backlog: VecDeque<PresenceEvent>,
    events: Option<BusSubscription>,
    phase: SessionPhase,
    closed: bool,
}

impl SubscriptionSession {
    /// Open a session: allocate an id, subscribe to the bus, snapshot the
    /// roster, register, and queue the replay backlog.
    ///
    /// Fails only on a duplicate-id insert, which is a defect given
    /// generator-assigned ids.
    pub fn open(registry: Arc<ClientRegistry>) -> PresenceResult<Self> {
        let client_id = ClientRegistry::generate_client_id();
        let info = ClientInfo::new(client_id.clone());

        // Bus subscription must exist before the registry is read or written.
        let events = registry.subscribe();
        let snapshot = registry.clients();
        registry.add_client(info.clone())?;

        let mut backlog = VecDeque::with_capacity(snapshot.len() + 1);
        backlog.push_back(PresenceEvent::connected(&info));
        for peer in snapshot {
            backlog.push_back(PresenceEvent::user_joined(peer));
        }

        tracing::debug!(client = %client_id, "Session opened");

        Ok(Self {
            registry,
            client_id,
            backlog,
            events: Some(events),
            phase: SessionPhase::Replaying,
            closed: false,
        })
    }

    /// This session's client id.
    pub fn client_id(&self) -> &ClientId {
        &self.client_id
    }

    /// Current phase.
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Next event for this session's stream: the replay backlog first, then
    /// live bus events with this session's own `user_joined` suppressed
    /// (it already announced itself via `connected`).
    ///
    /// Returns `None` once the session is closed or the bus is gone.
    pub async fn next_event(&mut self) -> Option<PresenceEvent> {
        if let Some(event) = self.backlog.pop_front() {
            return Some(event);
        }
        if self.phase == SessionPhase::Replaying {
            self.phase = SessionPhase::Live;
            tracing::debug!(client = %self.client_id, "Session live");
        }

        let events = self.events.as_mut()?;
        loop {
            let event = events.recv().await?;
            let forward = match &event {
                PresenceEvent::UserJoined { client } => client.client_id != self.client_id,
                PresenceEvent::Connected { .. }
                | PresenceEvent::StatusChanged { .. }
                | PresenceEvent::UserLeft { .. } => true,
            };
            if forward {
                return Some(event);
            }
        }
    }

    /// Tear the session down: unsubscribe from the bus, deregister (which
    /// broadcasts `user_left` to survivors), and drop any queued events.
    ///
    /// Idempotent single-fire: transport close, explicit unsubscribe and
    /// drop may all trigger it, and only the first call has any effect.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.phase = SessionPhase::Closed;
        self.events = None;
        self.backlog.clear();
        self.registry.remove_client(&self.client_id);
        tracing::debug!(client = %self.client_id, "Session closed");
    }
}

impl Drop for SubscriptionSession {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presence::event::ClientStatus;
    use std::time::Duration;
    use tokio::time::timeout;

    async fn next(session: &mut SubscriptionSession) -> PresenceEvent {
        timeout(Duration::from_secs(1), session.next_event())
            .await
            .expect("timed out waiting for event")
            .expect("stream ended")
    }

    #[tokio::test]
    async fn test_first_event_is_connected_self() {
        let registry = Arc::new(ClientRegistry::default());
        let mut session = SubscriptionSession::open(Arc::clone(&registry)).unwrap();

        let event = next(&mut session).await;
        assert!(matches!(
            event,
            PresenceEvent::Connected { client_id, .. } if client_id == *session.client_id()
        ));
    }

    #[tokio::test]
    async fn test_replay_contains_pre_existing_peers() {
        let registry = Arc::new(ClientRegistry::default());
        let mut first = SubscriptionSession::open(Arc::clone(&registry)).unwrap();
        let mut second = SubscriptionSession::open(Arc::clone(&registry)).unwrap();

        assert!(matches!(next(&mut second).await, PresenceEvent::Connected { .. }));
        match next(&mut second).await {
            PresenceEvent::UserJoined { client } => {
                assert_eq!(client.client_id, *first.client_id());
            }
            other => panic!("Expected replayed user_joined, got {:?}", other),
        }

        // The earlier session sees the newcomer live.
        assert!(matches!(next(&mut first).await, PresenceEvent::Connected { .. }));
        match next(&mut first).await {
            PresenceEvent::UserJoined { client } => {
                assert_eq!(client.client_id, *second.client_id());
            }
            other => panic!("Expected live user_joined, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_own_join_is_suppressed() {
        let registry = Arc::new(ClientRegistry::default());
        let mut session = SubscriptionSession::open(Arc::clone(&registry)).unwrap();

        assert!(matches!(next(&mut session).await, PresenceEvent::Connected { .. }));

        // The only bus event so far is this session's own user_joined; a
        // status change must be the next thing the stream yields.
        registry.set_status(session.client_id(), ClientStatus::Away);
        assert!(matches!(
            next(&mut session).await,
            PresenceEvent::StatusChanged { .. }
        ));
    }

    #[tokio::test]
    async fn test_phase_transitions() {
        let registry = Arc::new(ClientRegistry::default());
        let mut session = SubscriptionSession::open(Arc::clone(&registry)).unwrap();
        assert_eq!(session.phase(), SessionPhase::Replaying);

        assert!(matches!(next(&mut session).await, PresenceEvent::Connected { .. }));
        registry.set_status(session.client_id(), ClientStatus::Busy);
        let _ = next(&mut session).await;
        assert_eq!(session.phase(), SessionPhase::Live);

        session.close();
        assert_eq!(session.phase(), SessionPhase::Closed);
    }

    #[tokio::test]
    async fn test_close_deregisters_once() {
        let registry = Arc::new(ClientRegistry::default());
        let mut session = SubscriptionSession::open(Arc::clone(&registry)).unwrap();
        let mut observer = registry.subscribe();
        let id = session.client_id().clone();

        session.close();
        session.close();
        drop(session);

        assert!(registry.is_empty());
        assert!(matches!(
            observer.try_recv().unwrap(),
            PresenceEvent::UserLeft { client_id, .. } if client_id == id
        ));
        assert!(observer.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_drop_deregisters() {
        let registry = Arc::new(ClientRegistry::default());
        let session = SubscriptionSession::open(Arc::clone(&registry)).unwrap();
        assert_eq!(registry.len(), 1);

        drop(session);
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_next_event_after_close_is_none() {
        let registry = Arc::new(ClientRegistry::default());
        let mut session = SubscriptionSession::open(Arc::clone(&registry)).unwrap();

        session.close();
        assert!(session.next_event().await.is_none());
    }
}
