//! presenced - a single-process, in-memory presence service
//!
//! Clients hold a persistent WebSocket connection, receive a replayed roster
//! snapshot followed by live join/leave/status events, and mutate their own
//! status. One in-memory authority, bounded lossy fan-out.

pub mod cli;
pub mod presence;
pub mod server;
