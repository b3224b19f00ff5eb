//! CLI command implementations
//!
//! `start` boots the server: load config (defaults if the file is absent),
//! initialize logging, build the runtime, serve until ctrl-c.

use std::path::Path;

use crate::server::{PresenceServer, ServerConfig};

use super::args::{Cli, Command};
use super::errors::{CliError, CliResult};

/// Parse arguments and dispatch to the selected command.
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();

    match cli.command {
        Command::Start { config } => start(&config),
    }
}

/// Boot the presence server and serve until interrupted.
pub fn start(config_path: &Path) -> CliResult<()> {
    init_tracing();

    let config = load_config(config_path)?;
    tracing::info!(
        bind_addr = %config.bind_addr,
        bus_capacity = config.bus_capacity,
        "Starting presenced"
    );

    let runtime = tokio::runtime::Runtime::new()
        .map_err(|e| CliError::RuntimeError(e.to_string()))?;

    runtime.block_on(async {
        let server = PresenceServer::new(config);

        tokio::select! {
            result = server.run() => {
                result.map_err(|e| CliError::ServeFailed(e.to_string()))
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutdown signal received");
                server.shutdown();
                Ok(())
            }
        }
    })
}

/// Load config from `path`, falling back to defaults when the file does not
/// exist. A file that exists but fails to parse is a fatal error.
fn load_config(path: &Path) -> CliResult<ServerConfig> {
    if path.exists() {
        Ok(ServerConfig::load(path)?)
    } else {
        Ok(ServerConfig::default())
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "presenced=info".into()),
        )
        .init();
}
