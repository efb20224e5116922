//! Server configuration.
//!
//! Sources, later ones overriding earlier ones:
//!
//! 1. `/etc/sqs-relay/server.yaml`
//! 2. `./config/server.yaml`
//! 3. An explicit file, normally taken from `SQS_RELAY_CONFIG_FILE`
//! 4. Environment variables prefixed `SQS_RELAY__` with `__` as the nesting
//!    separator, e.g. `SQS_RELAY__GATEWAY__QUEUE_NAME=orders`
//!
//! Every field has a default, so an unconfigured environment still produces
//! a usable configuration.

use crate::errors::ServerError;
use serde::{Deserialize, Serialize};
use sqs_gateway::GatewayConfig;

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;

/// Environment variable naming an explicit configuration file
pub const CONFIG_FILE_ENV: &str = "SQS_RELAY_CONFIG_FILE";

/// Prefix for configuration environment variables
pub const ENV_PREFIX: &str = "SQS_RELAY";

/// Complete server configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// gRPC listener settings
    pub server: ListenerConfig,

    /// Queue the relay serves
    pub gateway: GatewayConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// gRPC listener configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on; 0 picks an ephemeral port
    pub port: u16,

    /// Time in-flight calls get to finish after a shutdown signal
    pub shutdown_timeout_seconds: u64,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 50051,
            shutdown_timeout_seconds: 30,
        }
    }
}

impl ListenerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
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

impl ServerConfig {
    /// Load configuration from the standard locations, the optional explicit
    /// file and the environment
    ///
    /// # Errors
    ///
    /// A malformed file, a missing explicit file or a value that cannot be
    /// converted to the field type is an error. Absent optional files are not.
    pub fn load(explicit_path: Option<&str>) -> Result<Self, ServerError> {
        let mut builder = config::Config::builder()
            .add_source(
                config::File::with_name("/etc/sqs-relay/server")
                    .required(false)
                    .format(config::FileFormat::Yaml),
            )
            .add_source(
                config::File::with_name("config/server")
                    .required(false)
                    .format(config::FileFormat::Yaml),
            );

        if let Some(path) = explicit_path.filter(|p| !p.is_empty()) {
            builder = builder.add_source(
                config::File::with_name(path)
                    .required(true)
                    .format(config::FileFormat::Yaml),
            );
        }

        let config: ServerConfig = builder
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Check the settings before anything is bound or connected
    pub fn validate(&self) -> Result<(), ServerError> {
        if self.server.host.trim().is_empty() {
            return Err(ServerError::Configuration {
                message: "server.host cannot be empty".to_string(),
            });
        }

        if self.server.shutdown_timeout_seconds == 0 {
            return Err(ServerError::Configuration {
                message: "server.shutdown_timeout_seconds must be greater than zero".to_string(),
            });
        }

        if self.logging.level.trim().is_empty() {
            return Err(ServerError::Configuration {
                message: "logging.level cannot be empty".to_string(),
            });
        }

        self.gateway
            .validate()
            .map_err(|e| ServerError::Configuration {
                message: e.to_string(),
            })
    }
}
