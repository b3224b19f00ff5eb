//! # Server Configuration
//!
//! Bind address and bus sizing for the presence server.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::presence::{PresenceError, PresenceResult, DEFAULT_BUS_CAPACITY};

/// Presence server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address (default: "0.0.0.0:9000")
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Event bus ring capacity (default: 1000)
    #[serde(default = "default_bus_capacity")]
    pub bus_capacity: usize,
}

fn default_bind_addr() -> String {
    "0.0.0.0:9000".to_string()
}

fn default_bus_capacity() -> usize {
    DEFAULT_BUS_CAPACITY
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            bus_capacity: default_bus_capacity(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> PresenceResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| PresenceError::ConfigError(format!("Failed to read config: {}", e)))?;

        let config: ServerConfig = serde_json::from_str(&content)
            .map_err(|e| PresenceError::ConfigError(format!("Invalid config JSON: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    fn validate(&self) -> PresenceResult<()> {
        if self.bus_capacity == 0 {
            return Err(PresenceError::ConfigError("bus_capacity must be > 0".into()));
        }
        if self.bind_addr.is_empty() {
            return Err(PresenceError::ConfigError("bind_addr must not be empty".into()));
        }
        Ok(())
    }
}
