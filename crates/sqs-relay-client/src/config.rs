//! Client configuration and command line.
//!
//! Sources, later ones overriding earlier ones:
//!
//! 1. `/etc/sqs-relay/client.yaml`
//! 2. `./config/client.yaml`
//! 3. The file given with `--config` (or `SQS_RELAY_CLIENT_CONFIG_FILE`)
//! 4. Environment variables prefixed `SQS_RELAY_CLIENT__`, e.g.
//!    `SQS_RELAY_CLIENT__POLLING__ERROR_LIMIT=3`
//! 5. Command line flags

use crate::driver::PollingSettings;
use crate::errors::ClientError;
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;

/// Prefix for configuration environment variables
pub const ENV_PREFIX: &str = "SQS_RELAY_CLIENT";

/// Largest batch SQS returns from one receive
pub const MAX_RECEIVE_MESSAGES: u32 = 10;

/// Longest long-poll wait SQS accepts, in seconds
pub const MAX_WAIT_TIME_SECONDS: u32 = 20;

/// Longest visibility timeout SQS accepts (12 hours), in seconds
pub const MAX_VISIBILITY_TIMEOUT_SECONDS: u32 = 43_200;

/// SQS relay polling client
#[derive(Debug, Parser)]
#[command(name = "sqs-relay-client")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Polls the SQS relay and deletes every message it receives")]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "SQS_RELAY_CLIENT_CONFIG_FILE")]
    pub config: Option<PathBuf>,

    /// Relay server address, e.g. http://localhost:50051
    #[arg(short, long)]
    pub server: Option<String>,

    /// Seconds between polling cycles
    #[arg(long)]
    pub polling_interval: Option<u64>,

    /// Seconds a received message stays hidden
    #[arg(long)]
    pub visibility_timeout: Option<u32>,

    /// Long-poll duration in seconds
    #[arg(long)]
    pub wait_time: Option<u32>,

    /// Maximum messages per receive
    #[arg(short, long)]
    pub max_messages: Option<u32>,

    /// Errors tolerated before the client gives up
    #[arg(short, long)]
    pub error_limit: Option<u64>,

    /// Logging level
    #[arg(short, long)]
    pub log_level: Option<String>,

    /// Enable JSON logging
    #[arg(long)]
    pub json_logs: bool,
}

/// Complete client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Relay server address
    pub server_address: String,

    pub polling: PollingSettings,

    pub logging: LoggingConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_address: "http://localhost:50051".to_string(),
            polling: PollingSettings::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter level when `RUST_LOG` is not set
    pub level: String,

    /// Enable JSON structured logging
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

impl ClientConfig {
    /// Merge files, environment and command line flags
    pub fn load(cli: &Cli) -> Result<Self, ClientError> {
        let mut builder = config::Config::builder()
            .add_source(
                config::File::with_name("/etc/sqs-relay/client")
                    .required(false)
                    .format(config::FileFormat::Yaml),
            )
            .add_source(
                config::File::with_name("config/client")
                    .required(false)
                    .format(config::FileFormat::Yaml),
            );

        if let Some(path) = &cli.config {
            builder = builder.add_source(
                config::File::from(path.as_path())
                    .required(true)
                    .format(config::FileFormat::Yaml),
            );
        }

        let builder = builder
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .set_override_option("server_address", cli.server.clone())?
            .set_override_option("polling.polling_interval_seconds", cli.polling_interval)?
            .set_override_option(
                "polling.visibility_timeout",
                cli.visibility_timeout.map(u64::from),
            )?
            .set_override_option("polling.wait_time", cli.wait_time.map(u64::from))?
            .set_override_option("polling.max_messages", cli.max_messages.map(u64::from))?
            .set_override_option("polling.error_limit", cli.error_limit)?
            .set_override_option("logging.level", cli.log_level.clone())?
            .set_override_option("logging.json_format", cli.json_logs.then_some(true))?;

        let config: ClientConfig = builder.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Check the settings before connecting
    pub fn validate(&self) -> Result<(), ClientError> {
        let parsed = url::Url::parse(&self.server_address).map_err(|e| ClientError::Configuration {
            message: format!("server address '{}' is not a valid URL: {}", self.server_address, e),
        })?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(ClientError::Configuration {
                message: format!("server address '{}' must use http or https", self.server_address),
            });
        }

        let polling = &self.polling;
        if polling.visibility_timeout == 0
            || polling.visibility_timeout > MAX_VISIBILITY_TIMEOUT_SECONDS
        {
            return Err(ClientError::Configuration {
                message: format!(
                    "polling.visibility_timeout must be 1-{} seconds, got {}",
                    MAX_VISIBILITY_TIMEOUT_SECONDS, polling.visibility_timeout
                ),
            });
        }

        if polling.wait_time > MAX_WAIT_TIME_SECONDS {
            return Err(ClientError::Configuration {
                message: format!(
                    "polling.wait_time must be 0-{} seconds, got {}",
                    MAX_WAIT_TIME_SECONDS, polling.wait_time
                ),
            });
        }

        if polling.max_messages == 0 || polling.max_messages > MAX_RECEIVE_MESSAGES {
            return Err(ClientError::Configuration {
                message: format!(
                    "polling.max_messages must be 1-{}, got {}",
                    MAX_RECEIVE_MESSAGES, polling.max_messages
                ),
            });
        }

        if self.logging.level.trim().is_empty() {
            return Err(ClientError::Configuration {
                message: "logging.level cannot be empty".to_string(),
            });
        }

        Ok(())
    }
}
