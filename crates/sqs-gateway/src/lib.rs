//! # SQS Gateway
//!
//! Narrow access to a single AWS SQS queue: resolve it once, then receive
//! and delete messages.
//!
//! ## Module Organization
//!
//! - [error] - Gateway, configuration and provider errors
//! - [message] - Queue names, receipt handles and receive options
//! - [provider] - The [`SqsApi`] seam and [`GatewayConfig`]
//! - [providers] - HTTP and in-memory [`SqsApi`] implementations
//! - [credentials] - AWS credential resolution
//! - [gateway] - The [`QueueGateway`] handle used by the relay server

pub mod credentials;
pub mod error;
pub mod gateway;
pub mod message;
pub mod provider;
pub mod providers;

pub use credentials::{resolve_credentials, AwsCredentials};
pub use error::{ConfigurationError, GatewayError, Operation, ProviderError};
pub use gateway::QueueGateway;
pub use message::{
    QueueName, ReceiptHandle, ReceiveOptions, ReceivedMessage, MAX_RECEIVE_MESSAGES,
    MAX_VISIBILITY_TIMEOUT_SECONDS, MAX_WAIT_TIME_SECONDS,
};
pub use provider::{GatewayConfig, ProviderType, SqsApi};
pub use providers::{InMemorySqs, SqsHttpApi};
