//! # Presence Events
//!
//! Roster types and the presence event stream vocabulary.
//!
//! Wire contract: events are tagged with `_tag`, field names are camelCase,
//! timestamps are integer milliseconds since the Unix epoch.

use std::fmt;
use std::str::FromStr;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::PresenceError;

/// Opaque identifier for one connected client.
///
/// Generated server-side per session; callers never pick their own id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(String);

impl ClientId {
    /// Generate a fresh random id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Borrow the underlying string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ClientId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ClientId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Presence status of a connected client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientStatus {
    /// Actively connected (initial status)
    #[default]
    Online,
    /// Connected but idle
    Away,
    /// Connected, do not disturb
    Busy,
}

impl ClientStatus {
    /// Returns the wire representation
    pub fn as_str(&self) -> &'static str {
        match self {
            ClientStatus::Online => "online",
            ClientStatus::Away => "away",
            ClientStatus::Busy => "busy",
        }
    }
}

impl fmt::Display for ClientStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ClientStatus {
    type Err = PresenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "online" => Ok(ClientStatus::Online),
            "away" => Ok(ClientStatus::Away),
            "busy" => Ok(ClientStatus::Busy),
            other => Err(PresenceError::InvalidStatus(other.to_string())),
        }
    }
}

/// Roster entry for one currently-connected client.
///
/// Consumers always receive copies, never an alias into registry state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientInfo {
    /// Client ID
    pub client_id: ClientId,

    /// Current status
    pub status: ClientStatus,

    /// When the client connected (ms since epoch)
    pub connected_at: i64,
}

impl ClientInfo {
    /// Create a roster entry for a client connecting now.
    pub fn new(client_id: ClientId) -> Self {
        Self {
            client_id,
            status: ClientStatus::default(),
            connected_at: now_millis(),
        }
    }
}

/// A presence change, as observed by subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "_tag", rename_all = "snake_case")]
pub enum PresenceEvent {
    /// First message of a session's own stream; never broadcast.
    #[serde(rename_all = "camelCase")]
    Connected { client_id: ClientId, connected_at: i64 },

    /// A client registered; also synthesized per pre-existing peer during
    /// snapshot replay.
    UserJoined { client: ClientInfo },

    /// A registered client changed its status.
    #[serde(rename_all = "camelCase")]
    StatusChanged {
        client_id: ClientId,
        status: ClientStatus,
        changed_at: i64,
    },

    /// A client's session ended.
    #[serde(rename_all = "camelCase")]
    UserLeft {
        client_id: ClientId,
        disconnected_at: i64,
    },
}

impl PresenceEvent {
    /// `connected` event for a session's own stream.
    pub fn connected(info: &ClientInfo) -> Self {
        PresenceEvent::Connected {
            client_id: info.client_id.clone(),
            connected_at: info.connected_at,
        }
    }

    /// `user_joined` event carrying the full roster entry.
    pub fn user_joined(client: ClientInfo) -> Self {
        PresenceEvent::UserJoined { client }
    }

    /// `status_changed` event stamped now.
    pub fn status_changed(client_id: ClientId, status: ClientStatus) -> Self {
        PresenceEvent::StatusChanged {
            client_id,
            status,
            changed_at: now_millis(),
        }
    }

    /// `user_left` event stamped now.
    pub fn user_left(client_id: ClientId) -> Self {
        PresenceEvent::UserLeft {
            client_id,
            disconnected_at: now_millis(),
        }
    }
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_parse() {
        assert_eq!("online".parse::<ClientStatus>().unwrap(), ClientStatus::Online);
        assert_eq!("away".parse::<ClientStatus>().unwrap(), ClientStatus::Away);
        assert_eq!("busy".parse::<ClientStatus>().unwrap(), ClientStatus::Busy);

        assert!(matches!(
            "offline".parse::<ClientStatus>(),
            Err(PresenceError::InvalidStatus(_))
        ));
    }

    #[test]
    fn test_new_client_is_online() {
        let info = ClientInfo::new(ClientId::generate());
        assert_eq!(info.status, ClientStatus::Online);
        assert!(info.connected_at > 0);
    }

    #[test]
    fn test_generated_ids_are_unique() {
        let a = ClientId::generate();
        let b = ClientId::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn test_client_info_wire_shape() {
        let info = ClientInfo {
            client_id: ClientId::from("c-1"),
            status: ClientStatus::Away,
            connected_at: 1700000000000,
        };

        let wire = serde_json::to_value(&info).unwrap();
        assert_eq!(
            wire,
            json!({
                "clientId": "c-1",
                "status": "away",
                "connectedAt": 1700000000000i64,
            })
        );
    }

    #[test]
    fn test_connected_wire_shape() {
        let info = ClientInfo {
            client_id: ClientId::from("c-1"),
            status: ClientStatus::Online,
            connected_at: 42,
        };

        let wire = serde_json::to_value(PresenceEvent::connected(&info)).unwrap();
        assert_eq!(wire["_tag"], "connected");
        assert_eq!(wire["clientId"], "c-1");
        assert_eq!(wire["connectedAt"], 42);
    }

    #[test]
    fn test_user_joined_wire_shape() {
        let info = ClientInfo {
            client_id: ClientId::from("c-2"),
            status: ClientStatus::Busy,
            connected_at: 7,
        };

        let wire = serde_json::to_value(PresenceEvent::user_joined(info)).unwrap();
        assert_eq!(wire["_tag"], "user_joined");
        assert_eq!(wire["client"]["clientId"], "c-2");
        assert_eq!(wire["client"]["status"], "busy");
    }

    #[test]
    fn test_status_changed_wire_shape() {
        let wire =
            serde_json::to_value(PresenceEvent::status_changed(ClientId::from("c-3"), ClientStatus::Away))
                .unwrap();
        assert_eq!(wire["_tag"], "status_changed");
        assert_eq!(wire["clientId"], "c-3");
        assert_eq!(wire["status"], "away");
        assert!(wire["changedAt"].as_i64().unwrap() > 0);
    }

    #[test]
    fn test_user_left_wire_shape() {
        let wire = serde_json::to_value(PresenceEvent::user_left(ClientId::from("c-4"))).unwrap();
        assert_eq!(wire["_tag"], "user_left");
        assert_eq!(wire["clientId"], "c-4");
        assert!(wire["disconnectedAt"].as_i64().unwrap() > 0);
    }

    #[test]
    fn test_event_round_trip() {
        let event = PresenceEvent::user_joined(ClientInfo::new(ClientId::generate()));
        let json = serde_json::to_string(&event).unwrap();
        let back: PresenceEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }
}
