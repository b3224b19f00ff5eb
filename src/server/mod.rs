//! # Presence Server
//!
//! WebSocket transport carrying the presence RPC surface.

pub mod config;
pub mod websocket;

pub use config::ServerConfig;
pub use websocket::{ClientMessage, PresenceServer, ServerMessage};
