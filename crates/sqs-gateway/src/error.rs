//! Error types for gateway operations.

use thiserror::Error;

/// Errors surfaced by [`QueueGateway`](crate::QueueGateway) operations.
///
/// The gateway distinguishes only two situations: startup could not reach a
/// usable queue (fatal, never retried) and a single receive or delete call
/// failed (the caller decides what to do with it).
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("{operation} failed: {source}")]
    Transient {
        operation: Operation,
        #[source]
        source: ProviderError,
    },
}

impl GatewayError {
    /// Wrap a provider failure raised by a per-request operation
    pub fn transient(operation: Operation, source: ProviderError) -> Self {
        Self::Transient { operation, source }
    }

    /// Check if the error only affects a single request
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }
}

/// Remote queue operation that produced a transient error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Receive,
    Delete,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Receive => write!(f, "ReceiveMessage"),
            Self::Delete => write!(f, "DeleteMessage"),
        }
    }
}

/// Startup configuration errors
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("No AWS credentials found for profile '{profile}'")]
    MissingCredentials { profile: String },

    #[error("Failed to read credentials file {path}: {message}")]
    CredentialsFile { path: String, message: String },

    #[error("Failed to resolve queue '{queue_name}': {source}")]
    QueueResolution {
        queue_name: String,
        #[source]
        source: ProviderError,
    },
}

/// Failures reported by an [`SqsApi`](crate::SqsApi) implementation
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("SQS service error: {code} - {message}")]
    Service { code: String, message: String },

    #[error("Queue not found: {0}")]
    QueueNotFound(String),

    #[error("Invalid receipt handle: {0}")]
    InvalidReceipt(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl ProviderError {
    /// Check if error is transient and a later identical call may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Authentication(_) => false,
            Self::Network(_) => true,
            Self::Service { .. } => true,
            Self::QueueNotFound(_) => false,
            Self::InvalidReceipt(_) => false,
            Self::Serialization(_) => false,
            Self::InvalidRequest(_) => false,
        }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
