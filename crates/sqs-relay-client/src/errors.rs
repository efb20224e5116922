//! Error types for the polling client.

use thiserror::Error;

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;

/// Terminal outcome of the polling loop
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DriverError {
    #[error("Error budget exceeded after {count} errors")]
    BudgetExceeded { count: u64 },
}

/// A single failed RPC against the relay server
#[derive(Debug, Clone, Error)]
#[error("RPC failed ({code:?}): {message}")]
pub struct SourceError {
    pub code: tonic::Code,
    pub message: String,
}

impl SourceError {
    pub fn new(code: tonic::Code, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl From<tonic::Status> for SourceError {
    fn from(status: tonic::Status) -> Self {
        Self::new(status.code(), status.message())
    }
}

/// Errors that end the client process
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Failed to connect to {address}: {message}")]
    Connect { address: String, message: String },

    #[error(transparent)]
    Driver(#[from] DriverError),
}

impl ClientError {
    /// Process exit code reported by the client binary
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Connect { .. } => 1,
            Self::Driver(_) => 2,
            Self::Configuration { .. } => 3,
        }
    }
}

impl From<config::ConfigError> for ClientError {
    fn from(error: config::ConfigError) -> Self {
        Self::Configuration {
            message: error.to_string(),
        }
    }
}
