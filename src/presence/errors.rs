//! # Presence Errors
//!
//! Error types for the presence core and its transport.

use thiserror::Error;

use super::event::ClientId;

/// Result type for presence operations
pub type PresenceResult<T> = Result<T, PresenceError>;

/// Presence errors
#[derive(Debug, Clone, Error)]
pub enum PresenceError {
    // ==================
    // Client Errors
    // ==================
    /// Status value outside {online, away, busy}
    #[error("Invalid status: {0}")]
    InvalidStatus(String),

    /// Malformed or unexpected request
    #[error("Invalid message format: {0}")]
    InvalidMessage(String),

    /// A second subscribe on an already-subscribed connection
    #[error("Already subscribed")]
    AlreadySubscribed,

    // ==================
    // Session Errors
    // ==================
    /// Connection closed
    #[error("Connection closed")]
    ConnectionClosed,

    // ==================
    // Programming Errors
    // ==================
    /// Registry insert with an id that is already registered.
    /// Ids are generator-assigned, so this is a defect, not a recoverable
    /// condition.
    #[error("Duplicate client id: {0}")]
    DuplicateClient(ClientId),

    // ==================
    // Internal Errors
    // ==================
    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl PresenceError {
    /// Returns the close code for WebSocket
    pub fn close_code(&self) -> u16 {
        match self {
            PresenceError::ConnectionClosed => 1000,
            PresenceError::InvalidMessage(_) => 1003,
            PresenceError::InvalidStatus(_) => 4000,
            PresenceError::AlreadySubscribed => 4001,
            PresenceError::DuplicateClient(_) => 4500,
            PresenceError::Internal(_) => 4500,
            PresenceError::ConfigError(_) => 4501,
        }
    }

    /// Returns the machine-readable error code sent to clients
    pub fn code(&self) -> &'static str {
        match self {
            PresenceError::InvalidStatus(_) => "INVALID_STATUS",
            PresenceError::InvalidMessage(_) => "INVALID_MESSAGE",
            PresenceError::AlreadySubscribed => "ALREADY_SUBSCRIBED",
            PresenceError::ConnectionClosed => "CONNECTION_CLOSED",
            PresenceError::DuplicateClient(_) => "DUPLICATE_CLIENT",
            PresenceError::Internal(_) => "INTERNAL",
            PresenceError::ConfigError(_) => "CONFIG_ERROR",
        }
    }
}
