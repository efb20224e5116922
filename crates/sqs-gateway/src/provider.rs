//! Provider seam and gateway configuration.

use crate::error::{ConfigurationError, ProviderError};
use crate::message::{QueueName, ReceiptHandle, ReceiveOptions, ReceivedMessage, MAX_WAIT_TIME_SECONDS};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[cfg(test)]
#[path = "provider_tests.rs"]
mod tests;

/// The three SQS actions the gateway relies on
///
/// Implemented by the HTTP provider for real queues and by the in-memory
/// provider for local development and tests.
#[async_trait]
pub trait SqsApi: Send + Sync {
    /// Resolve a queue name to the URL used by all other calls
    async fn get_queue_url(&self, queue_name: &QueueName) -> Result<String, ProviderError>;

    /// Receive up to `options.max_messages` messages
    async fn receive_message(
        &self,
        queue_url: &str,
        options: &ReceiveOptions,
    ) -> Result<Vec<ReceivedMessage>, ProviderError>;

    /// Delete one delivered message by its receipt handle
    async fn delete_message(
        &self,
        queue_url: &str,
        handle: &ReceiptHandle,
    ) -> Result<(), ProviderError>;

    /// Get provider type
    fn provider_type(&self) -> ProviderType;
}

/// Enumeration of supported queue providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    /// AWS SQS over its HTTP query API
    Aws,
    /// Process-local queue for development and tests
    Memory,
}

impl std::fmt::Display for ProviderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Aws => write!(f, "aws"),
            Self::Memory => write!(f, "memory"),
        }
    }
}

/// Gateway configuration, read once at startup
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Which provider backs the gateway
    pub provider: ProviderType,

    /// Logical queue name, resolved to a URL at startup
    pub queue_name: String,

    /// AWS region (e.g. "us-east-1")
    pub region: String,

    /// Profile in the shared credentials file
    pub profile: String,

    /// Endpoint override (LocalStack, VPC endpoints, tests)
    pub endpoint: Option<String>,

    /// Explicit access key; takes precedence over environment and profile
    pub access_key_id: Option<String>,

    /// Explicit secret key; takes precedence over environment and profile
    pub secret_access_key: Option<String>,

    /// Session token for temporary credentials
    pub session_token: Option<String>,

    /// HTTP request timeout in seconds; must outlast the longest long poll
    pub request_timeout_seconds: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            provider: ProviderType::Aws,
            queue_name: "sqs-sample-1".to_string(),
            region: "us-east-1".to_string(),
            profile: "default".to_string(),
            endpoint: None,
            access_key_id: None,
            secret_access_key: None,
            session_token: None,
            request_timeout_seconds: 30,
        }
    }
}

impl GatewayConfig {
    /// Validate settings before any network call is made
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        QueueName::new(self.queue_name.clone())?;

        if self.provider == ProviderType::Memory {
            return Ok(());
        }

        if self.region.trim().is_empty() {
            return Err(ConfigurationError::Invalid {
                message: "region cannot be empty".to_string(),
            });
        }

        if self.request_timeout_seconds <= u64::from(MAX_WAIT_TIME_SECONDS) {
            return Err(ConfigurationError::Invalid {
                message: format!(
                    "request timeout must exceed the {}s long-poll limit, got {}s",
                    MAX_WAIT_TIME_SECONDS, self.request_timeout_seconds
                ),
            });
        }

        if let Some(endpoint) = &self.endpoint {
            let parsed = url::Url::parse(endpoint).map_err(|e| ConfigurationError::Invalid {
                message: format!("endpoint '{}' is not a valid URL: {}", endpoint, e),
            })?;
            if parsed.scheme() != "http" && parsed.scheme() != "https" {
                return Err(ConfigurationError::Invalid {
                    message: format!("endpoint '{}' must use http or https", endpoint),
                });
            }
        }

        if self.access_key_id.is_some() != self.secret_access_key.is_some() {
            return Err(ConfigurationError::Invalid {
                message: "access_key_id and secret_access_key must be set together".to_string(),
            });
        }

        Ok(())
    }

    /// Endpoint the HTTP provider talks to
    pub fn endpoint_url(&self) -> String {
        match &self.endpoint {
            Some(endpoint) => endpoint.trim_end_matches('/').to_string(),
            None => format!("https://sqs.{}.amazonaws.com", self.region),
        }
    }
}

impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("provider", &self.provider)
            .field("queue_name", &self.queue_name)
            .field("region", &self.region)
            .field("profile", &self.profile)
            .field("endpoint", &self.endpoint)
            .field("access_key_id", &self.access_key_id)
            .field(
                "secret_access_key",
                &self.secret_access_key.as_ref().map(|_| "<REDACTED>"),
            )
            .field(
                "session_token",
                &self.session_token.as_ref().map(|_| "<REDACTED>"),
            )
            .field("request_timeout_seconds", &self.request_timeout_seconds)
            .finish()
    }
}
