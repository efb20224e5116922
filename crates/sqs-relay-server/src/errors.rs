//! Error types for the relay server.

use sqs_gateway::GatewayError;
use thiserror::Error;

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;

/// Errors that stop the server from starting or running
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Gateway initialization failed: {0}")]
    Gateway(#[from] GatewayError),

    #[error("Failed to bind to address {address}: {message}")]
    BindFailed { address: String, message: String },

    #[error("Server failed: {message}")]
    ServerFailed { message: String },
}

impl ServerError {
    /// Process exit code reported by the server binary
    ///
    /// Anything that prevents the gateway from being usable is treated as a
    /// configuration problem.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::BindFailed { .. } => 1,
            Self::ServerFailed { .. } => 2,
            Self::Configuration { .. } | Self::Gateway(_) => 3,
        }
    }
}

impl From<config::ConfigError> for ServerError {
    fn from(error: config::ConfigError) -> Self {
        Self::Configuration {
            message: error.to_string(),
        }
    }
}
