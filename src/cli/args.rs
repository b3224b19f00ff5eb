//! CLI argument definitions using clap
//!
//! Commands:
//! - presenced start --config <path>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// presenced - a single-process, in-memory presence service
#[derive(Parser, Debug)]
#[command(name = "presenced")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the presence server
    Start {
        /// Path to configuration file
        #[arg(long, default_value = "./presenced.json")]
        config: PathBuf,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_default_config() {
        let cli = Cli::try_parse_from(["presenced", "start"]).unwrap();
        match cli.command {
            Command::Start { config } => {
                assert_eq!(config, PathBuf::from("./presenced.json"));
            }
        }
    }

    #[test]
    fn test_start_explicit_config() {
        let cli = Cli::try_parse_from(["presenced", "start", "--config", "/etc/presenced.json"])
            .unwrap();
        match cli.command {
            Command::Start { config } => {
                assert_eq!(config, PathBuf::from("/etc/presenced.json"));
            }
        }
    }

    #[test]
    fn test_missing_command_rejected() {
        assert!(Cli::try_parse_from(["presenced"]).is_err());
    }
}
