//! CLI-specific error types
//!
//! All CLI errors are fatal: the process prints them and exits non-zero.

use thiserror::Error;

use crate::presence::PresenceError;

/// Result type for CLI commands
pub type CliResult<T> = Result<T, CliError>;

/// CLI error
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration file error
    #[error("PRESENCED_CLI_CONFIG_ERROR: {0}")]
    ConfigError(String),

    /// Async runtime could not be built
    #[error("PRESENCED_CLI_RUNTIME_ERROR: {0}")]
    RuntimeError(String),

    /// Server failed to boot or serve
    #[error("PRESENCED_CLI_SERVE_FAILED: {0}")]
    ServeFailed(String),
}

impl From<PresenceError> for CliError {
    fn from(e: PresenceError) -> Self {
        match e {
            PresenceError::ConfigError(msg) => CliError::ConfigError(msg),
            other => CliError::ServeFailed(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_in_display() {
        let e = CliError::ConfigError("bad json".into());
        assert!(e.to_string().starts_with("PRESENCED_CLI_CONFIG_ERROR"));
    }

    #[test]
    fn test_presence_config_error_maps_to_config() {
        let e: CliError = PresenceError::ConfigError("x".into()).into();
        assert!(matches!(e, CliError::ConfigError(_)));
    }
}
