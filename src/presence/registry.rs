//! # Client Registry
//!
//! Authoritative mapping of connected clients to their presence state.
//!
//! Every mutation publishes its event while still holding the map lock, so
//! registry state and the corresponding broadcast are observed together:
//! no snapshot can contain a client whose `user_joined` was never published,
//! and no `user_left` can race a still-visible roster entry. Publishing
//! inside the critical section is safe because bus publish never blocks.

use std::collections::HashMap;
use std::sync::Mutex;

use super::bus::{BusSubscription, EventBus};
use super::errors::{PresenceError, PresenceResult};
use super::event::{ClientId, ClientInfo, ClientStatus, PresenceEvent};

/// Registry of connected clients, fanning out changes over an [`EventBus`].
#[derive(Debug)]
pub struct ClientRegistry {
    clients: Mutex<HashMap<ClientId, ClientInfo>>,
    bus: EventBus,
}

impl ClientRegistry {
    /// Create a registry whose bus holds `bus_capacity` events.
    pub fn new(bus_capacity: usize) -> Self {
        Self {
            clients: Mutex::new(HashMap::new()),
            bus: EventBus::new(bus_capacity),
        }
    }

    /// Generate a fresh client id.
    pub fn generate_client_id() -> ClientId {
        ClientId::generate()
    }

    /// Subscribe to the registry's event stream.
    pub fn subscribe(&self) -> BusSubscription {
        self.bus.subscribe()
    }

    /// Register a client and broadcast `user_joined`.
    ///
    /// Ids are generator-assigned, so a duplicate insert is a defect and is
    /// reported as [`PresenceError::DuplicateClient`] rather than silently
    /// overwriting the existing entry.
    pub fn add_client(&self, info: ClientInfo) -> PresenceResult<()> {
        let mut clients = self
            .clients
            .lock()
            .map_err(|_| PresenceError::Internal("Lock poisoned".into()))?;

        if clients.contains_key(&info.client_id) {
            return Err(PresenceError::DuplicateClient(info.client_id));
        }

        self.bus.publish(PresenceEvent::user_joined(info.clone()));
        clients.insert(info.client_id.clone(), info);

        Ok(())
    }

    /// Deregister a client and broadcast `user_left`.
    ///
    /// No-op if the id is absent, so racing cleanup paths (explicit
    /// unsubscribe vs. transport close) stay idempotent.
    pub fn remove_client(&self, client_id: &ClientId) {
        if let Ok(mut clients) = self.clients.lock() {
            if clients.remove(client_id).is_some() {
                self.bus.publish(PresenceEvent::user_left(client_id.clone()));
                tracing::debug!(client = %client_id, "Client removed");
            }
        }
    }

    /// Update a client's status in place and broadcast `status_changed`.
    ///
    /// No-op if the id is absent (the client raced a disconnect).
    pub fn set_status(&self, client_id: &ClientId, status: ClientStatus) {
        if let Ok(mut clients) = self.clients.lock() {
            if let Some(info) = clients.get_mut(client_id) {
                info.status = status;
                self.bus
                    .publish(PresenceEvent::status_changed(client_id.clone(), status));
                tracing::debug!(client = %client_id, status = %status, "Status changed");
            }
        }
    }

    /// Point-in-time copy of all registered clients. Order is not significant.
    pub fn clients(&self) -> Vec<ClientInfo> {
        self.clients
            .lock()
            .map(|m| m.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Whether the id is currently registered.
    pub fn contains(&self, client_id: &ClientId) -> bool {
        self.clients
            .lock()
            .map(|m| m.contains_key(client_id))
            .unwrap_or(false)
    }

    /// Number of registered clients.
    pub fn len(&self) -> usize {
        self.clients.lock().map(|m| m.len()).unwrap_or(0)
    }

    /// Check if no clients are registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ClientRegistry {
    fn default() -> Self {
        Self::new(super::bus::DEFAULT_BUS_CAPACITY)
    }
}
